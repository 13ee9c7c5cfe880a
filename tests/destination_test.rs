//! Integration tests for destination registries

use fieldmap::{
    Constructor, Destination, Destinations, Record, Translation, TranslationConfig,
    TranslationError, STRICT,
};
use serde_json::{json, Value};

#[derive(Debug)]
struct TestObject {
    name: String,
    options: Record,
}

impl Destination for TestObject {
    const NAME: &'static str = "TestObject";

    fn from_record(record: Record) -> Result<Self, TranslationError> {
        Err(TranslationError::Construction(format!(
            "TestObject requires a name, got {} fields",
            record.len()
        )))
    }

    fn custom_constructor() -> Option<Constructor<Self>> {
        Some(|mut params| {
            let name = match params.shift_remove("name") {
                Some(Value::String(name)) => name,
                _ => return Err(TranslationError::Construction("missing name".to_string())),
            };
            Ok(TestObject { name, options: params })
        })
    }

    fn column_names() -> Vec<String> {
        vec!["id".to_string(), "first_name".to_string(), "last_name".to_string()]
    }
}

#[derive(Debug)]
struct PlainObject {
    options: Record,
}

impl Destination for PlainObject {
    const NAME: &'static str = "PlainObject";

    fn from_record(record: Record) -> Result<Self, TranslationError> {
        Ok(PlainObject { options: record })
    }
}

fn source() -> Value {
    json!({"Name": "test object", "Key1": "Value1", "Key2": "Value2"})
}

fn create_map<T: Destination>(destinations: &mut Destinations) -> &mut Translation<T> {
    destinations.attach_named::<T, _>("hash_source", |m| {
        m.set_option(STRICT, true)
            .link("name", "Name")
            .link("first_key", "Key1")
            .link("second_key", "Key2")
            .remove_processor();
    })
}

#[test]
fn test_create_map() {
    let mut destinations = Destinations::new();
    create_map::<TestObject>(&mut destinations);

    let dtm = destinations.registry::<TestObject>().unwrap().get("hash_source").unwrap();

    assert!(dtm.options().is_strict());
    assert_eq!(dtm.link_for("name").and_then(|d| d.field_name()), Some("Name"));
    assert_eq!(dtm.link_for("first_key").and_then(|d| d.field_name()), Some("Key1"));
    assert_eq!(dtm.link_for("second_key").and_then(|d| d.field_name()), Some("Key2"));
}

#[test]
fn test_create_new_object_using_custom_constructor() {
    let mut destinations = Destinations::new();
    create_map::<TestObject>(&mut destinations);

    let to = destinations
        .registry::<TestObject>()
        .unwrap()
        .build_from("hash_source", &source())
        .unwrap();

    assert_eq!(to.name, "test object");
    assert_eq!(to.options["first_key"], json!("Value1"));
    assert_eq!(to.options["second_key"], json!("Value2"));
}

#[test]
fn test_create_new_object_using_default_constructor() {
    let mut destinations = Destinations::new();
    create_map::<PlainObject>(&mut destinations);

    let to = destinations
        .registry::<PlainObject>()
        .unwrap()
        .build_from("hash_source", &source())
        .unwrap();

    assert_eq!(to.options["name"], json!("test object"));
    assert_eq!(to.options["first_key"], json!("Value1"));
    assert_eq!(to.options["second_key"], json!("Value2"));
}

#[test]
fn test_processor_overrides_constructors() {
    let mut destinations = Destinations::new();
    create_map::<PlainObject>(&mut destinations).set_processor(|results| {
        let mut values: Vec<String> = results
            .values()
            .filter_map(|v| v.as_str().map(String::from))
            .collect();
        // Sorted for a stable comparison
        values.sort();

        let mut options = Record::new();
        options.insert("sorted".to_string(), json!(values));
        Ok(PlainObject { options })
    });

    let to = destinations
        .registry::<PlainObject>()
        .unwrap()
        .build_from("hash_source", &source())
        .unwrap();

    assert_eq!(to.options["sorted"], json!(["Value1", "Value2", "test object"]));
}

#[test]
fn test_attach_named_yields_mapping() {
    let mut destinations = Destinations::new();
    destinations.attach_named::<PlainObject, _>("hash_source", |dtm| {
        dtm.link("first_key", "Key1");
    });

    let registry = destinations.registry::<PlainObject>().unwrap();
    assert_eq!(
        registry.get("hash_source").unwrap().link_for("first_key").and_then(|d| d.field_name()),
        Some("Key1")
    );
}

#[test]
fn test_attach_only_once() {
    let mut destinations = Destinations::new();

    create_map::<TestObject>(&mut destinations);
    destinations.attach::<TestObject>();
    destinations.attach::<TestObject>();

    assert_eq!(destinations.attached_count(), 1);
    assert_eq!(destinations.registry::<TestObject>().unwrap().len(), 1);
}

#[test]
fn test_stub_from_column_names() {
    let mut destinations = Destinations::new();
    let registry = destinations.attach::<TestObject>();

    assert_eq!(
        registry.stub_from_column_names("my_name"),
        "destinations.attach_named::<TestObject, _>(\"my_name\", |dtm| {\n\
         \tdtm.link(\"id\", \"id\");\n\
         \tdtm.link(\"first_name\", \"first_name\");\n\
         \tdtm.link(\"last_name\", \"last_name\");\n\
         });"
    );
}

#[test]
fn test_apply_config_to_registry() {
    let config = TranslationConfig::from_yaml_str(
        r#"
translations:
  hash_source:
    static:
      source: legacy
    links:
      name: Name
      first_key: Key1
"#,
    )
    .unwrap();

    let mut destinations = Destinations::new();
    let registry = destinations.attach::<PlainObject>();
    registry.apply_config(&config);
    registry.mapping_named("hash_source").link_fn("shout", |src| {
        json!(src.text("Name").unwrap_or_default().to_uppercase())
    });

    let to = registry.build_from("hash_source", &source()).unwrap();

    assert_eq!(to.options["source"], json!("legacy"));
    assert_eq!(to.options["first_key"], json!("Value1"));
    assert_eq!(to.options["shout"], json!("TEST OBJECT"));
}

struct GlobalOnly;

impl Destination for GlobalOnly {
    const NAME: &'static str = "GlobalOnly";

    fn from_record(_record: Record) -> Result<Self, TranslationError> {
        Ok(GlobalOnly)
    }
}

#[test]
fn test_global_destinations() {
    {
        let mut destinations = Destinations::global().write().unwrap();
        destinations.attach_named::<GlobalOnly, _>("global", |m| {
            m.link("a", "A");
        });
    }

    let destinations = Destinations::global().read().unwrap();
    assert!(destinations.is_attached::<GlobalOnly>());
    assert!(destinations.registry::<GlobalOnly>().unwrap().contains("global"));
}
