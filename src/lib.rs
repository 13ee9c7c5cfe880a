//! # fieldmap: Declarative Field Mapping
//!
//! fieldmap turns records of one shape into records (or objects) of another
//! shape without hand-written conversion code per type.
//!
//! ## Features
//!
//! - **Translations**: link destination keys to source fields, computed functions,
//!   or static values, then transform any record in one call
//! - **Source adapters**: JSON values, standard maps and property-bearing objects
//!   can all be read; map-like sources are always read by key
//! - **Destination registries**: attach named translations to a target type and
//!   build instances of it straight from source records
//! - **YAML configuration**: declare links, static values and options outside code
//!
//! ## Example
//!
//! ```
//! use fieldmap::{Options, Translation};
//! use serde_json::json;
//!
//! let dt = Translation::configured(|m| {
//!     m.set_static("source_id", 1)
//!         .link("first_name", "FirstName")
//!         .link("last_name", "LastName");
//! });
//!
//! let source = json!({"FirstName": "Scott"});
//!
//! // LastName is missing: strict mode fails, lenient mode leaves it out
//! assert!(dt.transform(&source).is_err());
//!
//! let results = dt.transform_with(&source, &Options::lenient()).unwrap();
//! assert_eq!(results["first_name"], json!("Scott"));
//! assert!(!results.contains_key("last_name"));
//! ```

// Core modules
pub mod source;
pub mod translation;
pub mod destination;
pub mod config;

// Re-export key types
pub use source::{Source, Resolution, Object, Method, json_type_name};
pub use translation::{
    Translation, TranslationError, SourceDescriptor, Options, Outcome, Record,
    ComputedFn, Processor, STRICT,
};
pub use destination::{
    Destination, Destinations, Registry, Constructor, render_stub, DEFAULT_STUB_NAME,
};
pub use config::{TranslationConfig, TranslationDef};
