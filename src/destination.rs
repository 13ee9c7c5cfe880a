//! Destination registries: named translations attached to a target type.
//!
//! A type opts in by implementing [`Destination`]. Its translations live in a
//! [`Registry`], and registries are kept one per type in a [`Destinations`]
//! table. A process-wide table is available through [`Destinations::global`].
//!
//! # Example
//!
//! ```
//! use fieldmap::{Destination, Destinations, Record, TranslationError};
//! use serde_json::json;
//!
//! struct Contact {
//!     fields: Record,
//! }
//!
//! impl Destination for Contact {
//!     const NAME: &'static str = "Contact";
//!
//!     fn from_record(record: Record) -> Result<Self, TranslationError> {
//!         Ok(Contact { fields: record })
//!     }
//! }
//!
//! let mut destinations = Destinations::new();
//! destinations.attach_named::<Contact, _>("crm", |dtm| {
//!     dtm.link("email", "EmailAddress");
//! });
//!
//! let registry = destinations.registry::<Contact>().unwrap();
//! let contact = registry
//!     .build_from("crm", &json!({"EmailAddress": "ada@example.com"}))
//!     .unwrap();
//!
//! assert_eq!(contact.fields["email"], json!("ada@example.com"));
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::RwLock;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use tracing::debug;

use crate::config::TranslationConfig;
use crate::source::Source;
use crate::translation::{Outcome, Record, Translation, TranslationError};

/// Translation name used by [`Registry::stub_from_column_names`] when none is given
pub const DEFAULT_STUB_NAME: &str = "name";

/// Custom construction function for a destination type
pub type Constructor<T> = fn(Record) -> Result<T, TranslationError>;

/// Target type that translations can construct.
pub trait Destination: Sized + 'static {
    /// The name of this destination type
    const NAME: &'static str;

    /// Ordinary constructor, receiving the transformed record.
    fn from_record(record: Record) -> Result<Self, TranslationError>;

    /// Custom construction, preferred over [`Destination::from_record`] when present.
    fn custom_constructor() -> Option<Constructor<Self>> {
        None
    }

    /// Field or column names, used to stub out translations.
    fn column_names() -> Vec<String> {
        Vec::new()
    }
}

/// Named translations for one destination type.
pub struct Registry<T> {
    mappings: IndexMap<String, Translation<T>>,
}

impl<T: Destination> Registry<T> {
    pub fn new() -> Self {
        Self {
            mappings: IndexMap::new(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        T::NAME
    }

    /// Translation registered under `name`, created empty on first reference.
    pub fn mapping_named(&mut self, name: impl Into<String>) -> &mut Translation<T> {
        self.mappings.entry(name.into()).or_insert_with_key(|name| {
            debug!(destination = T::NAME, translation = %name, "Creating translation");
            Translation::empty()
        })
    }

    /// Like [`Registry::mapping_named`], then run `configure` on the
    /// translation. Runs on every call, not only on creation.
    pub fn configure_mapping<F>(&mut self, name: impl Into<String>, configure: F) -> &mut Translation<T>
    where
        F: FnOnce(&mut Translation<T>),
    {
        let mapping = self.mapping_named(name);
        configure(&mut *mapping);
        mapping
    }

    pub fn get(&self, name: &str) -> Option<&Translation<T>> {
        self.mappings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.mappings.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.mappings.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Transform `source` with the named translation and construct a `T`.
    ///
    /// Construction is attempted in order:
    /// 1. the translation's post-processor
    /// 2. `T::custom_constructor()`
    /// 3. `T::from_record()`
    ///
    /// An unregistered name behaves like an empty translation.
    pub fn build_from(&self, name: &str, source: &dyn Source) -> Result<T, TranslationError> {
        let empty;
        let mapping = match self.mappings.get(name) {
            Some(mapping) => mapping,
            None => {
                debug!(destination = T::NAME, translation = %name, "Building from unregistered translation");
                empty = Translation::empty();
                &empty
            }
        };

        let record = match mapping.build(source)? {
            Outcome::Processed(instance) => return Ok(instance),
            Outcome::Transformed(record) => record,
        };

        match T::custom_constructor() {
            Some(construct) => construct(record),
            None => T::from_record(record),
        }
    }

    /// Configure translations from a loaded configuration, creating any that
    /// don't exist yet.
    pub fn apply_config(&mut self, config: &TranslationConfig) {
        for (name, def) in &config.translations {
            def.apply_to(self.mapping_named(name.as_str()));
        }
    }

    /// Source text registering `name` with one identity link per column of `T`.
    pub fn stub_from_column_names(&self, name: &str) -> String {
        render_stub(T::NAME, name, &T::column_names())
    }
}

impl<T: Destination> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a registration stub for `type_name` linking each column to itself.
///
/// # Example
///
/// ```
/// let stub = fieldmap::render_stub("User", "csv", &["id".to_string()]);
/// assert_eq!(
///     stub,
///     "destinations.attach_named::<User, _>(\"csv\", |dtm| {\n\tdtm.link(\"id\", \"id\");\n});"
/// );
/// ```
pub fn render_stub(type_name: &str, name: &str, columns: &[String]) -> String {
    let mut lines = vec![format!(
        "destinations.attach_named::<{}, _>({:?}, |dtm| {{",
        type_name, name
    )];

    for column in columns {
        lines.push(format!("\tdtm.link({:?}, {:?});", column, column));
    }

    lines.push("});".to_string());

    lines.join("\n")
}

static GLOBAL: Lazy<RwLock<Destinations>> = Lazy::new(|| RwLock::new(Destinations::new()));

/// Table of destination registries, at most one per type.
#[derive(Default)]
pub struct Destinations {
    registries: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Destinations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide table, created on first access.
    pub fn global() -> &'static RwLock<Destinations> {
        &GLOBAL
    }

    /// Attach a registry to `T`. Attaching an already attached type returns
    /// the existing registry untouched.
    pub fn attach<T: Destination>(&mut self) -> &mut Registry<T> {
        self.registries
            .entry(TypeId::of::<T>())
            .or_insert_with(|| {
                debug!(destination = T::NAME, "Attaching destination registry");
                Box::new(Registry::<T>::new()) as Box<dyn Any + Send + Sync>
            })
            .downcast_mut::<Registry<T>>()
            .expect("registry stored under its own TypeId")
    }

    /// Attach `T`, then get-or-create the translation `name` and run
    /// `configure` on it.
    pub fn attach_named<T, F>(&mut self, name: impl Into<String>, configure: F) -> &mut Translation<T>
    where
        T: Destination,
        F: FnOnce(&mut Translation<T>),
    {
        self.attach::<T>().configure_mapping(name, configure)
    }

    pub fn is_attached<T: Destination>(&self) -> bool {
        self.registries.contains_key(&TypeId::of::<T>())
    }

    pub fn registry<T: Destination>(&self) -> Option<&Registry<T>> {
        self.registries
            .get(&TypeId::of::<T>())
            .and_then(|registry| registry.downcast_ref())
    }

    pub fn registry_mut<T: Destination>(&mut self) -> Option<&mut Registry<T>> {
        self.registries
            .get_mut(&TypeId::of::<T>())
            .and_then(|registry| registry.downcast_mut())
    }

    /// Number of attached destination types.
    pub fn attached_count(&self) -> usize {
        self.registries.len()
    }
}
