//! Input record abstractions.
//!
//! A [`Source`] is anything a translation can read fields from. Sources expose
//! up to two capabilities: named property access (struct fields, zero-argument
//! methods) and keyed lookup (map-like containers). Each source declares the
//! order in which the two are tried, so map-like containers are always read by
//! key before anything else.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Strategy used to resolve a field identifier against a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Named property, attribute or zero-argument method
    PropertyAccess,
    /// `source[key]` on a map-like container
    KeyedLookup,
}

const PROPERTIES_FIRST: &[Resolution] = &[Resolution::PropertyAccess, Resolution::KeyedLookup];
const KEYS_FIRST: &[Resolution] = &[Resolution::KeyedLookup, Resolution::PropertyAccess];

/// Capability trait for input records.
///
/// Implement this for any type that should be readable by a
/// [`Translation`](crate::Translation). Only [`Source::source_type`] is
/// required; a source with no other capability can still feed computed links.
///
/// # Example
///
/// ```
/// use fieldmap::Source;
/// use serde_json::{json, Value};
///
/// struct Invoice {
///     number: u32,
/// }
///
/// impl Source for Invoice {
///     fn source_type(&self) -> String {
///         "Invoice".to_string()
///     }
///
///     fn property(&self, name: &str) -> Option<Value> {
///         match name {
///             "number" => Some(json!(self.number)),
///             _ => None,
///         }
///     }
/// }
///
/// let invoice = Invoice { number: 7 };
/// assert_eq!(invoice.field("number"), Some(json!(7)));
/// ```
pub trait Source {
    /// Runtime type name, reported in resolution errors
    fn source_type(&self) -> String;

    /// Read a named property or call a zero-argument method.
    fn property(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Whether this source behaves like a map.
    fn supports_keyed_lookup(&self) -> bool {
        false
    }

    /// Look up a key. Only consulted when [`Source::supports_keyed_lookup`]
    /// returns `true`; `None` means the key is absent.
    fn keyed(&self, _key: &str) -> Option<Value> {
        None
    }

    /// Order in which resolution strategies are tried.
    ///
    /// Map-like sources go key-first so that data stored under a key never
    /// gets shadowed by a property of the same name.
    fn resolution_order(&self) -> &'static [Resolution] {
        if self.supports_keyed_lookup() {
            KEYS_FIRST
        } else {
            PROPERTIES_FIRST
        }
    }

    /// Apply a single resolution strategy.
    fn resolve(&self, strategy: Resolution, name: &str) -> Option<Value> {
        match strategy {
            Resolution::PropertyAccess => self.property(name),
            Resolution::KeyedLookup if self.supports_keyed_lookup() => self.keyed(name),
            Resolution::KeyedLookup => None,
        }
    }

    /// First value found for `name` across all strategies, in order.
    fn field(&self, name: &str) -> Option<Value> {
        self.resolution_order()
            .iter()
            .find_map(|strategy| self.resolve(*strategy, name))
    }

    /// Like [`Source::field`], rendering strings without JSON quotes.
    fn text(&self, name: &str) -> Option<String> {
        self.field(name).map(|value| match value {
            Value::String(s) => s,
            other => other.to_string(),
        })
    }
}

/// Name of a JSON value's kind, used as its runtime type
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// JSON objects are keyed containers. Other JSON values expose nothing.
impl Source for Value {
    fn source_type(&self) -> String {
        json_type_name(self).to_string()
    }

    fn supports_keyed_lookup(&self) -> bool {
        self.is_object()
    }

    fn keyed(&self, key: &str) -> Option<Value> {
        self.as_object().and_then(|map| map.get(key)).cloned()
    }
}

macro_rules! keyed_source {
    ($($ty:ty => $label:expr),* $(,)?) => {
        $(
            impl Source for $ty {
                fn source_type(&self) -> String {
                    $label.to_string()
                }

                fn supports_keyed_lookup(&self) -> bool {
                    true
                }

                fn keyed(&self, key: &str) -> Option<Value> {
                    self.get(key).cloned()
                }
            }
        )*
    };
}

keyed_source! {
    serde_json::Map<String, Value> => "Map",
    HashMap<String, Value> => "HashMap",
    BTreeMap<String, Value> => "BTreeMap",
    IndexMap<String, Value> => "IndexMap",
}

/// Zero-argument method exposed by an [`Object`]
pub type Method = Arc<dyn Fn() -> Value + Send + Sync>;

#[derive(Clone)]
enum Property {
    Value(Value),
    Method(Method),
}

/// Property-bearing source: named attributes and zero-argument methods.
///
/// `Object` never supports keyed lookup, so links against it resolve only
/// through properties.
///
/// # Example
///
/// ```
/// use fieldmap::{Object, Source};
/// use serde_json::json;
///
/// let user = Object::new("User")
///     .with_property("first", "Ada")
///     .with_method("greeting", || json!("hello"));
///
/// assert_eq!(user.field("first"), Some(json!("Ada")));
/// assert_eq!(user.field("greeting"), Some(json!("hello")));
/// ```
#[derive(Clone)]
pub struct Object {
    type_name: String,
    properties: IndexMap<String, Property>,
}

impl Object {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            properties: IndexMap::new(),
        }
    }

    /// Add an attribute holding a fixed value.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), Property::Value(value.into()));
        self
    }

    /// Add a zero-argument method, evaluated on every read.
    pub fn with_method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.properties.insert(name.into(), Property::Method(Arc::new(method)));
        self
    }

    /// Expose the fields of any serializable struct as properties.
    ///
    /// The type must serialize to a map; the object's type name is the last
    /// path segment of `T`'s Rust type name.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let type_name = std::any::type_name::<T>()
            .rsplit("::")
            .next()
            .unwrap_or("object")
            .to_string();

        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Self {
                type_name,
                properties: map
                    .into_iter()
                    .map(|(k, v)| (k, Property::Value(v)))
                    .collect(),
            }),
            other => Err(<serde_json::Error as serde::ser::Error>::custom(format!(
                "{} serialized to {}, expected an object",
                type_name,
                json_type_name(&other)
            ))),
        }
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(|k| k.as_str())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("type_name", &self.type_name)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Source for Object {
    fn source_type(&self) -> String {
        self.type_name.clone()
    }

    fn property(&self, name: &str) -> Option<Value> {
        match self.properties.get(name)? {
            Property::Value(value) => Some(value.clone()),
            Property::Method(method) => Some(method()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_json_object_is_keyed() {
        let source = json!({"zip": "99999"});

        assert!(source.supports_keyed_lookup());
        assert_eq!(source.resolution_order()[0], Resolution::KeyedLookup);
        assert_eq!(source.field("zip"), Some(json!("99999")));
        assert_eq!(source.field("missing"), None);
        assert_eq!(source.source_type(), "object");
    }

    #[test]
    fn test_scalar_json_exposes_nothing() {
        let source = json!("just a string");

        assert!(!source.supports_keyed_lookup());
        assert_eq!(source.field("len"), None);
        assert_eq!(source.source_type(), "string");
    }

    #[test]
    fn test_map_adapters() {
        let mut hash = HashMap::new();
        hash.insert("Key1".to_string(), json!("Value1"));
        assert_eq!(hash.field("Key1"), Some(json!("Value1")));
        assert_eq!(hash.source_type(), "HashMap");

        let mut btree = BTreeMap::new();
        btree.insert("Key1".to_string(), json!(1));
        assert_eq!(btree.field("Key1"), Some(json!(1)));

        let mut index = IndexMap::new();
        index.insert("Key1".to_string(), Value::Null);
        // Present-but-null is still present
        assert_eq!(index.keyed("Key1"), Some(Value::Null));
        assert_eq!(index.keyed("Key2"), None);
    }

    #[test]
    fn test_object_methods_are_called_on_each_read() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let source = Object::new("Counter").with_method("next", move || {
            json!(counter.fetch_add(1, Ordering::SeqCst))
        });

        assert_eq!(source.field("next"), Some(json!(0)));
        assert_eq!(source.field("next"), Some(json!(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_object_is_not_keyed() {
        let source = Object::new("Mock").with_property("Key1", "Value1");

        assert!(!source.supports_keyed_lookup());
        assert_eq!(source.resolve(Resolution::KeyedLookup, "Key1"), None);
        assert_eq!(source.resolve(Resolution::PropertyAccess, "Key1"), Some(json!("Value1")));
    }

    #[derive(Serialize)]
    struct Address {
        street: String,
        zip: u32,
    }

    #[test]
    fn test_object_from_serialize() {
        let address = Address {
            street: "1 Main St".to_string(),
            zip: 99999,
        };

        let source = Object::from_serialize(&address).unwrap();

        assert_eq!(source.source_type(), "Address");
        assert_eq!(source.field("zip"), Some(json!(99999)));
        assert_eq!(source.text("street"), Some("1 Main St".to_string()));
        assert_eq!(source.property_names().collect::<Vec<_>>(), vec!["street", "zip"]);
    }

    #[test]
    fn test_object_from_non_map_fails() {
        assert!(Object::from_serialize(&42).is_err());
    }

    #[test]
    fn test_text_renders_numbers() {
        let source = json!({"Area": 123});
        assert_eq!(source.text("Area"), Some("123".to_string()));
    }
}
