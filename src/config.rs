//! Declarative translation configuration.
//!
//! Loads named translations from YAML so that field links can live next to
//! the data they describe instead of in code.
//!
//! ```yaml
//! translations:
//!   hash_source:
//!     options:
//!       strict: true
//!     static:
//!       source_id: 1
//!     links:
//!       name: Name
//!       first_key: Key1
//! ```
//!
//! Only field links can be declared; computed links are added in code after
//! the configuration is applied.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::translation::{Translation, TranslationError};

/// Named translations loaded from a YAML document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranslationConfig {
    /// Translation definitions: name -> definition
    pub translations: IndexMap<String, TranslationDef>,
}

/// One translation as declared in YAML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranslationDef {
    #[serde(default)]
    pub options: IndexMap<String, Value>,

    /// Destination key -> literal value
    #[serde(default, rename = "static")]
    pub static_values: IndexMap<String, Value>,

    /// Destination key -> source field
    #[serde(default)]
    pub links: IndexMap<String, String>,
}

impl TranslationConfig {
    /// Load translation configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `TranslationError::Config` if the file can't be read or isn't
    /// a valid configuration.
    ///
    /// # Example
    /// ```ignore
    /// use fieldmap::TranslationConfig;
    ///
    /// let config = TranslationConfig::load_from_file("config/fieldmap.yaml")?;
    /// println!("Translations: {:?}", config.names().collect::<Vec<_>>());
    /// ```
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, TranslationError> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path).map_err(|e| {
            TranslationError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml_str(&contents)
    }

    /// Parse translation configuration from YAML text.
    pub fn from_yaml_str(contents: &str) -> Result<Self, TranslationError> {
        serde_yaml::from_str(contents)
            .map_err(|e| TranslationError::Config(format!("Failed to parse YAML: {}", e)))
    }

    pub fn get(&self, name: &str) -> Option<&TranslationDef> {
        self.translations.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.translations.keys().map(|k| k.as_str())
    }

    /// Build the named translation, producing records.
    pub fn translation(&self, name: &str) -> Option<Translation> {
        self.get(name).map(TranslationDef::to_translation)
    }
}

impl TranslationDef {
    /// Apply options, static values and links on top of `translation`.
    ///
    /// Existing entries with the same names are overwritten; everything else
    /// is left alone.
    pub fn apply_to<T>(&self, translation: &mut Translation<T>) {
        for (name, value) in &self.options {
            translation.set_option(name.as_str(), value.clone());
        }

        for (to, value) in &self.static_values {
            translation.set_static(to.as_str(), value.clone());
        }

        for (to, from) in &self.links {
            translation.link(to.as_str(), from.as_str());
        }
    }

    pub fn to_translation<T>(&self) -> Translation<T> {
        let mut translation = Translation::empty();
        self.apply_to(&mut translation);
        translation
    }
}
