//! Mapping definitions and the transform algorithm.
//!
//! A [`Translation`] associates destination keys with sources: static values,
//! fields of the input record, or computed functions. Transforming an input
//! record produces a new [`Record`] keyed by destination key, which an optional
//! post-processor can turn into a finished value.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::source::Source;

/// Transformed output: destination key -> value, in insertion order
pub type Record = IndexMap<String, Value>;

/// Computed link source. Receives the input record.
pub type ComputedFn = Arc<dyn Fn(&dyn Source) -> Result<Value, TranslationError> + Send + Sync>;

/// Post-processor turning a transformed record into a final value.
pub type Processor<T> = Arc<dyn Fn(Record) -> Result<T, TranslationError> + Send + Sync>;

/// Name of the strictness option
pub const STRICT: &str = "strict";

/// Error type for translation operations
#[derive(Debug)]
pub enum TranslationError {
    /// A linked field could not be read from the input record
    NonresponsiveSource {
        destination: String,
        descriptor: String,
        source_type: String,
    },
    /// Failure raised by a caller-supplied function, passed through as-is
    Callback(Box<dyn Error + Send + Sync>),
    Construction(String),
    Config(String),
}

impl TranslationError {
    /// Wrap an error raised inside a computed link or processor.
    pub fn callback(err: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        TranslationError::Callback(err.into())
    }
}

impl fmt::Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationError::NonresponsiveSource {
                destination,
                descriptor,
                source_type,
            } => write!(
                f,
                "{}: {} does not respond to '{}'",
                destination, source_type, descriptor
            ),
            TranslationError::Callback(err) => write!(f, "{}", err),
            TranslationError::Construction(msg) => write!(f, "Construction error: {}", msg),
            TranslationError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for TranslationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TranslationError::Callback(err) => Some(&**err as &(dyn Error + 'static)),
            _ => None,
        }
    }
}

/// Where a linked destination key gets its value from
#[derive(Clone)]
pub enum SourceDescriptor {
    /// Field identifier read from the input record
    Field(String),
    /// Function of the input record
    Computed(ComputedFn),
}

impl SourceDescriptor {
    pub fn field_name(&self) -> Option<&str> {
        match self {
            SourceDescriptor::Field(name) => Some(name),
            SourceDescriptor::Computed(_) => None,
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, SourceDescriptor::Computed(_))
    }
}

impl fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceDescriptor::Field(name) => f.debug_tuple("Field").field(name).finish(),
            SourceDescriptor::Computed(_) => f.write_str("Computed(<fn>)"),
        }
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceDescriptor::Field(name) => write!(f, "{}", name),
            SourceDescriptor::Computed(_) => write!(f, "<computed>"),
        }
    }
}

impl From<&str> for SourceDescriptor {
    fn from(name: &str) -> Self {
        SourceDescriptor::Field(name.to_string())
    }
}

impl From<String> for SourceDescriptor {
    fn from(name: String) -> Self {
        SourceDescriptor::Field(name)
    }
}

/// Named translation options.
///
/// Unknown names are stored and carried along but never interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options {
    values: IndexMap<String, Value>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with strict mode turned off.
    pub fn lenient() -> Self {
        Self::new().with(STRICT, false)
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Strict unless the `strict` option is literally `false`.
    pub fn is_strict(&self) -> bool {
        !matches!(self.values.get(STRICT), Some(Value::Bool(false)))
    }

    /// Shallow merge; `overrides` wins on conflicting names.
    pub fn merged(&self, overrides: &Options) -> Options {
        let mut values = self.values.clone();
        values.extend(overrides.values.iter().map(|(k, v)| (k.clone(), v.clone())));
        Options { values }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Result of [`Translation::build`]
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The post-processor ran and produced this value
    Processed(T),
    /// No post-processor was set
    Transformed(Record),
}

impl<T> Outcome<T> {
    pub fn processed(self) -> Option<T> {
        match self {
            Outcome::Processed(value) => Some(value),
            Outcome::Transformed(_) => None,
        }
    }

    pub fn transformed(self) -> Option<Record> {
        match self {
            Outcome::Processed(_) => None,
            Outcome::Transformed(record) => Some(record),
        }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, Outcome::Processed(_))
    }
}

/// A named set of links, static values and options.
///
/// `T` is the post-processor's output type. Free-standing translations
/// default to producing [`Record`]s; translations held by a
/// [`Registry`](crate::Registry) produce the destination type.
///
/// # Example
///
/// ```
/// use fieldmap::Translation;
/// use serde_json::json;
///
/// let agent = Translation::configured(|m| {
///     m.set_static("source_id", 1)
///         .link("login", "Username")
///         .link_fn("phone_number", |src| {
///             json!(format!(
///                 "({}) {}",
///                 src.text("Area").unwrap_or_default(),
///                 src.text("Phone").unwrap_or_default()
///             ))
///         });
/// });
///
/// let source = json!({"Username": "spatterson", "Area": "123", "Phone": "456-7890"});
/// let results = agent.transform(&source).unwrap();
///
/// assert_eq!(results["login"], json!("spatterson"));
/// assert_eq!(results["phone_number"], json!("(123) 456-7890"));
/// assert_eq!(results["source_id"], json!(1));
/// ```
pub struct Translation<T = Record> {
    links: IndexMap<String, SourceDescriptor>,
    static_values: Record,
    options: Options,
    processor: Option<Processor<T>>,
}

impl Translation<Record> {
    /// Create an empty translation producing records.
    pub fn new() -> Self {
        Self::empty()
    }

    /// Create a translation and hand it to `configure` for setup.
    pub fn configured(configure: impl FnOnce(&mut Self)) -> Self {
        let mut translation = Self::new();
        configure(&mut translation);
        translation
    }
}

impl<T> Translation<T> {
    /// Create an empty translation with the default options (`strict: true`).
    pub fn empty() -> Self {
        Self {
            links: IndexMap::new(),
            static_values: Record::new(),
            options: Options::new().with(STRICT, true),
            processor: None,
        }
    }

    pub fn set_option(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.options.set(name, value);
        self
    }

    /// Always emit `value` for `to`, regardless of the input record.
    pub fn set_static(&mut self, to: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.static_values.insert(to.into(), value.into());
        self
    }

    /// Link a destination key to a field of the input record.
    pub fn link(&mut self, to: impl Into<String>, from: impl Into<String>) -> &mut Self {
        self.link_descriptor(to, SourceDescriptor::Field(from.into()))
    }

    /// Link a destination key to a function of the input record.
    pub fn link_fn<F>(&mut self, to: impl Into<String>, compute: F) -> &mut Self
    where
        F: Fn(&dyn Source) -> Value + Send + Sync + 'static,
    {
        self.try_link_fn(to, move |source| Ok(compute(source)))
    }

    /// Like [`Translation::link_fn`], for functions that can fail. Errors are
    /// returned from `transform` untouched.
    pub fn try_link_fn<F>(&mut self, to: impl Into<String>, compute: F) -> &mut Self
    where
        F: Fn(&dyn Source) -> Result<Value, TranslationError> + Send + Sync + 'static,
    {
        self.link_descriptor(to, SourceDescriptor::Computed(Arc::new(compute)))
    }

    pub fn link_descriptor(&mut self, to: impl Into<String>, from: SourceDescriptor) -> &mut Self {
        self.links.insert(to.into(), from);
        self
    }

    pub fn processor(&self) -> Option<&Processor<T>> {
        self.processor.as_ref()
    }

    pub fn has_processor(&self) -> bool {
        self.processor.is_some()
    }

    /// Set the function [`Translation::build`] applies to transformed records.
    pub fn set_processor<F>(&mut self, processor: F) -> &mut Self
    where
        F: Fn(Record) -> Result<T, TranslationError> + Send + Sync + 'static,
    {
        self.processor = Some(Arc::new(processor));
        self
    }

    /// Clear the post-processor, returning it if one was set.
    pub fn remove_processor(&mut self) -> Option<Processor<T>> {
        self.processor.take()
    }

    pub fn links(&self) -> &IndexMap<String, SourceDescriptor> {
        &self.links
    }

    pub fn link_for(&self, to: &str) -> Option<&SourceDescriptor> {
        self.links.get(to)
    }

    pub fn static_values(&self) -> &Record {
        &self.static_values
    }

    pub fn static_value(&self, to: &str) -> Option<&Value> {
        self.static_values.get(to)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Reconfigure in place.
    pub fn configure(&mut self, configure: impl FnOnce(&mut Self)) -> &mut Self {
        configure(self);
        self
    }

    /// Transform `source` using the stored options.
    pub fn transform(&self, source: &dyn Source) -> Result<Record, TranslationError> {
        self.transform_with(source, &Options::new())
    }

    /// Transform `source`, with `call_options` overriding the stored options
    /// for this call only.
    ///
    /// Links override static values sharing a destination key. Any error
    /// aborts the whole call.
    pub fn transform_with(
        &self,
        source: &dyn Source,
        call_options: &Options,
    ) -> Result<Record, TranslationError> {
        let options = self.options.merged(call_options);
        let strict = options.is_strict();

        debug!(
            links = self.links.len(),
            statics = self.static_values.len(),
            strict,
            source_type = %source.source_type(),
            "Transforming record"
        );

        let mut results = self.apply_static_values();
        results.extend(self.apply_links(source, strict)?);

        Ok(results)
    }

    /// Transform `source`, then run the post-processor if one is set.
    pub fn build(&self, source: &dyn Source) -> Result<Outcome<T>, TranslationError> {
        self.build_with(source, &Options::new())
    }

    pub fn build_with(
        &self,
        source: &dyn Source,
        call_options: &Options,
    ) -> Result<Outcome<T>, TranslationError> {
        let results = self.transform_with(source, call_options)?;

        match &self.processor {
            Some(processor) => processor(results).map(Outcome::Processed),
            None => Ok(Outcome::Transformed(results)),
        }
    }

    fn apply_static_values(&self) -> Record {
        self.static_values.clone()
    }

    fn apply_links(&self, source: &dyn Source, strict: bool) -> Result<Record, TranslationError> {
        let mut results = Record::with_capacity(self.links.len());

        for (to, from) in &self.links {
            match resolve_link(source, to, from, strict)? {
                Some(value) => {
                    trace!(destination = %to, descriptor = %from, "Resolved link");
                    results.insert(to.clone(), value);
                }
                None => {
                    debug!(destination = %to, descriptor = %from, "Omitting missing key");
                }
            }
        }

        Ok(results)
    }
}

/// Resolve one link. `Ok(None)` means the key is omitted (lenient mode only).
fn resolve_link(
    source: &dyn Source,
    to: &str,
    from: &SourceDescriptor,
    strict: bool,
) -> Result<Option<Value>, TranslationError> {
    let name = match from {
        SourceDescriptor::Computed(compute) => return compute(source).map(Some),
        SourceDescriptor::Field(name) => name,
    };

    if let Some(value) = source
        .resolution_order()
        .iter()
        .find_map(|strategy| source.resolve(*strategy, name))
    {
        return Ok(Some(value));
    }

    if !strict && source.supports_keyed_lookup() {
        return Ok(None);
    }

    Err(TranslationError::NonresponsiveSource {
        destination: to.to_string(),
        descriptor: name.clone(),
        source_type: source.source_type(),
    })
}

impl<T> Default for Translation<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Clone for Translation<T> {
    fn clone(&self) -> Self {
        Self {
            links: self.links.clone(),
            static_values: self.static_values.clone(),
            options: self.options.clone(),
            processor: self.processor.clone(),
        }
    }
}

impl<T> fmt::Debug for Translation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Translation")
            .field("links", &self.links)
            .field("static_values", &self.static_values)
            .field("options", &self.options)
            .field("processor", &self.processor.as_ref().map(|_| "<fn>"))
            .finish()
    }
}
