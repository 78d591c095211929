//! Task form schema and edit state.
//!
//! Schemas come from the engine as loosely shaped JSON. [`FormSchema`] is the
//! normalized, typed form; `services::form_normalizer` produces it. Fields the
//! client does not model are carried in `extra` so nothing is lost on a
//! round trip.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Schema type used when the engine sends none.
pub const DEFAULT_SCHEMA_TYPE: &str = "default";

/// Schema version stamped on schemas that carry none.
pub const DEFAULT_SCHEMA_VERSION: u64 = 18;

/// Field type of a form component.
///
/// Unknown names are kept as [`ComponentType::Other`] rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Textfield,
    Textarea,
    Number,
    Checkbox,
    Checklist,
    Radio,
    Select,
    Taglist,
    Datetime,
    Button,
    Text,
    Html,
    Image,
    Separator,
    Spacer,
    Group,
    DynamicList,
    Table,
    Iframe,
    Other(String),
}

impl ComponentType {
    /// Type assigned to components whose type is missing or empty.
    pub const FALLBACK: ComponentType = ComponentType::Textfield;

    pub fn as_str(&self) -> &str {
        match self {
            Self::Textfield => "textfield",
            Self::Textarea => "textarea",
            Self::Number => "number",
            Self::Checkbox => "checkbox",
            Self::Checklist => "checklist",
            Self::Radio => "radio",
            Self::Select => "select",
            Self::Taglist => "taglist",
            Self::Datetime => "datetime",
            Self::Button => "button",
            Self::Text => "text",
            Self::Html => "html",
            Self::Image => "image",
            Self::Separator => "separator",
            Self::Spacer => "spacer",
            Self::Group => "group",
            Self::DynamicList => "dynamiclist",
            Self::Table => "table",
            Self::Iframe => "iframe",
            Self::Other(name) => name,
        }
    }

    /// Resolve a type name. Empty names resolve to the fallback.
    pub fn from_name(name: &str) -> Self {
        match name {
            "" => Self::FALLBACK,
            "textfield" => Self::Textfield,
            "textarea" => Self::Textarea,
            "number" => Self::Number,
            "checkbox" => Self::Checkbox,
            "checklist" => Self::Checklist,
            "radio" => Self::Radio,
            "select" => Self::Select,
            "taglist" => Self::Taglist,
            "datetime" => Self::Datetime,
            "button" => Self::Button,
            "text" => Self::Text,
            "html" => Self::Html,
            "image" => Self::Image,
            "separator" => Self::Separator,
            "spacer" => Self::Spacer,
            "group" => Self::Group,
            "dynamiclist" => Self::DynamicList,
            "table" => Self::Table,
            "iframe" => Self::Iframe,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether components of this type hold nested components.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Group | Self::DynamicList)
    }
}

impl Serialize for ComponentType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ComponentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

/// One field (or container of fields) in a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormComponent {
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<FormComponent>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FormComponent {
    pub fn new(component_type: ComponentType) -> Self {
        Self {
            component_type,
            components: None,
            extra: Map::new(),
        }
    }

    /// Data key bound by this component, if any.
    pub fn key(&self) -> Option<&str> {
        self.extra.get("key").and_then(Value::as_str)
    }

    pub fn label(&self) -> Option<&str> {
        self.extra.get("label").and_then(Value::as_str)
    }
}

/// Normalized task form schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub schema_version: u64,
    pub components: Vec<FormComponent>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for FormSchema {
    fn default() -> Self {
        Self {
            schema_type: DEFAULT_SCHEMA_TYPE.to_string(),
            schema_version: DEFAULT_SCHEMA_VERSION,
            components: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl FormSchema {
    /// Serialize back to the engine's JSON shape.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Walk every component, nested ones included, in document order.
    pub fn walk(&self) -> Vec<&FormComponent> {
        fn visit<'a>(components: &'a [FormComponent], out: &mut Vec<&'a FormComponent>) {
            for component in components {
                out.push(component);
                if let Some(children) = &component.components {
                    visit(children, out);
                }
            }
        }
        let mut out = Vec::new();
        visit(&self.components, &mut out);
        out
    }

    /// Initial form data: every keyed component's `defaultValue`.
    pub fn initial_data(&self) -> Value {
        let mut data = Map::new();
        for component in self.walk() {
            if let (Some(key), Some(default)) = (component.key(), component.extra.get("defaultValue")) {
                data.insert(key.to_string(), default.clone());
            }
        }
        Value::Object(data)
    }
}

/// Edit state of a task form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    pub data: Value,
    #[serde(default)]
    pub errors: HashMap<String, Vec<String>>,
    pub initial_data: Value,
}

impl FormState {
    /// Untouched state: data equals the initial data and nothing is flagged.
    pub fn pristine(initial_data: Value) -> Self {
        Self {
            data: initial_data.clone(),
            errors: HashMap::new(),
            initial_data,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_error(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.errors.entry(field.into()).or_default().push(message.into());
        self
    }

    /// Any reported field counts, even one whose message list is empty.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Deep comparison against the initial data.
    pub fn is_changed(&self) -> bool {
        self.data != self.initial_data
    }
}
