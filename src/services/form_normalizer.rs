//! Repair task form schemas into a shape the renderer always accepts.
//!
//! Engines hand back whatever was attached to the task: `null`, schemas
//! without a type, components that are not objects. Normalization fills
//! those gaps and keeps every other field untouched, so it is lossless for
//! well-formed schemas and idempotent.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::models::form::{
    ComponentType, FormComponent, FormSchema, DEFAULT_SCHEMA_TYPE, DEFAULT_SCHEMA_VERSION,
};

/// Normalize a raw form schema.
pub fn normalize_schema(raw: &Value) -> FormSchema {
    let Value::Object(fields) = raw else {
        if !raw.is_null() {
            warn!(kind = json_kind(raw), "form schema is not an object; using empty form");
        }
        return FormSchema::default();
    };

    let mut extra = fields.clone();
    let schema_type = non_blank_str(extra.remove("type").as_ref())
        .unwrap_or(DEFAULT_SCHEMA_TYPE)
        .to_string();
    let schema_version = extra
        .remove("schemaVersion")
        .and_then(|v| v.as_u64())
        .unwrap_or(DEFAULT_SCHEMA_VERSION);
    let components = normalize_components(extra.remove("components").as_ref());

    FormSchema {
        schema_type,
        schema_version,
        components,
        extra,
    }
}

fn normalize_components(raw: Option<&Value>) -> Vec<FormComponent> {
    match raw {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(normalize_component)
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            debug!(kind = json_kind(other), "components is not an array; dropped");
            Vec::new()
        }
    }
}

fn normalize_component(raw: &Value) -> FormComponent {
    let Value::Object(fields) = raw else {
        return FormComponent::new(ComponentType::FALLBACK);
    };

    let mut extra: Map<String, Value> = fields.clone();
    let component_type = non_blank_str(extra.remove("type").as_ref())
        .map(ComponentType::from_name)
        .unwrap_or(ComponentType::FALLBACK);
    let components = match extra.remove("components") {
        None | Some(Value::Null) => None,
        Some(nested) => Some(normalize_components(Some(&nested))),
    };

    FormComponent {
        component_type,
        components,
        extra,
    }
}

fn non_blank_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
