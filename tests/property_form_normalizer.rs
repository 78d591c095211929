use flowgate::services::normalize_schema;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-z ]{0,8}".prop_map(Value::String),
    ]
}

/// Loosely shaped form components: sometimes typed, sometimes not, sometimes
/// not objects at all, with optional nested children.
fn component() -> impl Strategy<Value = Value> {
    let flat = (
        prop::option::of(prop_oneof![
            Just(json!("textfield")),
            Just(json!("checkbox")),
            Just(json!("")),
            Just(json!(7)),
            "[a-z]{1,8}".prop_map(Value::String),
        ]),
        prop::option::of("[a-z]{1,6}"),
        prop::option::of(leaf()),
    )
        .prop_map(|(component_type, key, default)| {
            let mut object = Map::new();
            if let Some(t) = component_type {
                object.insert("type".to_string(), t);
            }
            if let Some(k) = key {
                object.insert("key".to_string(), Value::String(k));
            }
            if let Some(d) = default {
                object.insert("defaultValue".to_string(), d);
            }
            Value::Object(object)
        });

    let base = prop_oneof![4 => flat, 1 => leaf()];
    base.prop_recursive(3, 24, 4, |inner| {
        (prop::collection::vec(inner, 0..4), prop_oneof![Just(json!("group")), Just(json!("dynamiclist"))])
            .prop_map(|(children, container)| json!({"type": container, "components": children}))
    })
}

fn schema() -> impl Strategy<Value = Value> {
    prop_oneof![
        1 => leaf(),
        4 => (
            prop::option::of(prop_oneof![Just(json!("default")), Just(json!("")), Just(json!(3))]),
            prop::option::of(prop_oneof![Just(json!(16)), Just(json!(-1)), Just(json!("18"))]),
            prop::option::of(prop::collection::vec(component(), 0..6)),
        )
            .prop_map(|(schema_type, version, components)| {
                let mut object = Map::new();
                object.insert("id".to_string(), json!("Form_1"));
                if let Some(t) = schema_type {
                    object.insert("type".to_string(), t);
                }
                if let Some(v) = version {
                    object.insert("schemaVersion".to_string(), v);
                }
                if let Some(c) = components {
                    object.insert("components".to_string(), Value::Array(c));
                }
                Value::Object(object)
            }),
    ]
}

proptest! {
    /// Normalizing an already normalized schema changes nothing.
    #[test]
    fn prop_normalization_is_idempotent(raw in schema()) {
        let once = normalize_schema(&raw);
        let twice = normalize_schema(&once.to_value());
        prop_assert_eq!(once, twice);
    }

    /// Every component in a normalized schema has a non-blank type.
    #[test]
    fn prop_every_component_is_typed(raw in schema()) {
        let normalized = normalize_schema(&raw);
        prop_assert!(!normalized.schema_type.trim().is_empty());
        for component in normalized.walk() {
            prop_assert!(!component.component_type.as_str().trim().is_empty());
        }
    }
}
