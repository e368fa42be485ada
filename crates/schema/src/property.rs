use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::EntityId;

/// Value type of a model property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    Number,
    Boolean,
    /// ISO-8601 string on the wire.
    Date,
    Object,
    Array,
    #[default]
    Any,
}

impl PropertyType {
    /// Whether `value` is acceptable for this type. `null` is always accepted;
    /// required-ness is checked separately.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (PropertyType::Any, _) => true,
            (PropertyType::String, Value::String(_)) => true,
            (PropertyType::Date, Value::String(_)) => true,
            (PropertyType::Number, Value::Number(_)) => true,
            (PropertyType::Boolean, Value::Bool(_)) => true,
            (PropertyType::Object, Value::Object(_)) => true,
            (PropertyType::Array, Value::Array(_)) => true,
            _ => false,
        }
    }

    /// Parse an id received as text (e.g. a URL path segment) according to
    /// the declared id type.
    pub fn parse_id(&self, raw: &str) -> EntityId {
        match self {
            PropertyType::String | PropertyType::Date => EntityId::String(raw.to_string()),
            _ => raw
                .parse::<i64>()
                .map(EntityId::Number)
                .unwrap_or_else(|_| EntityId::String(raw.to_string())),
        }
    }
}

/// A single declared property of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDefinition {
    /// May be omitted in model files, where properties are keyed by name.
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub ty: PropertyType,
    /// Marks the identity property.
    #[serde(default)]
    pub id: bool,
    /// Value is generated by the datasource when omitted.
    #[serde(default)]
    pub generated: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Element type when `ty` is [`PropertyType::Array`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<PropertyType>,
}

impl PropertyDefinition {
    pub fn new(name: impl Into<String>, ty: PropertyType) -> Self {
        Self {
            name: name.into(),
            ty,
            id: false,
            generated: false,
            required: false,
            default: None,
            item_type: None,
        }
    }

    /// A generated identity property.
    pub fn id(name: impl Into<String>, ty: PropertyType) -> Self {
        Self {
            id: true,
            generated: true,
            ..Self::new(name, ty)
        }
    }

    /// An array property whose elements are of `item_type`.
    pub fn array(name: impl Into<String>, item_type: PropertyType) -> Self {
        Self {
            item_type: Some(item_type),
            ..Self::new(name, PropertyType::Array)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Identity property whose value the caller always supplies.
    pub fn not_generated(mut self) -> Self {
        self.generated = false;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Type check including array elements.
    pub fn accepts(&self, value: &Value) -> bool {
        if !self.ty.accepts(value) {
            return false;
        }
        match (self.item_type, value) {
            (Some(item), Value::Array(items)) => items.iter().all(|v| item.accepts(v)),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_matching_values() {
        let prop = PropertyDefinition::new("name", PropertyType::String);
        assert!(prop.accepts(&json!("Bob")));
        assert!(prop.accepts(&Value::Null));
        assert!(!prop.accepts(&json!(3)));

        let roles = PropertyDefinition::array("roles", PropertyType::Object);
        assert!(roles.accepts(&json!([{"name": "admin"}])));
        assert!(!roles.accepts(&json!(["admin"])));
    }

    #[test]
    fn parses_ids_by_type() {
        assert_eq!(PropertyType::Number.parse_id("12"), EntityId::Number(12));
        assert_eq!(
            PropertyType::String.parse_id("12"),
            EntityId::String("12".into())
        );
        assert_eq!(
            PropertyType::Any.parse_id("abc"),
            EntityId::String("abc".into())
        );
    }

    #[test]
    fn deserializes_from_model_json() {
        let prop: PropertyDefinition = serde_json::from_value(json!({
            "name": "isShipped",
            "type": "boolean",
            "default": false
        }))
        .unwrap();
        assert_eq!(prop.ty, PropertyType::Boolean);
        assert_eq!(prop.default, Some(json!(false)));
        assert!(!prop.required);
    }
}
