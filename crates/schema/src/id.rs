use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identity of an entity instance.
///
/// Connectors differ in the id types they generate (sequences, UUIDs,
/// object ids), so the id is either a number or a string. Serialized
/// untagged, so `EntityId::Number(1)` is the JSON value `1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(i64),
    String(String),
}

impl EntityId {
    /// Read an id out of a JSON value. Floats, booleans and containers are not ids.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(EntityId::Number),
            Value::String(s) => Some(EntityId::String(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            EntityId::Number(n) => Value::from(*n),
            EntityId::String(s) => Value::String(s.clone()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            EntityId::Number(n) => Some(*n),
            EntityId::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            EntityId::Number(_) => None,
            EntityId::String(s) => Some(s),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{}", n),
            EntityId::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        EntityId::Number(value)
    }
}

impl From<i32> for EntityId {
    fn from(value: i32) -> Self {
        EntityId::Number(value.into())
    }
}

impl From<u32> for EntityId {
    fn from(value: u32) -> Self {
        EntityId::Number(value.into())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        EntityId::String(value)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        EntityId::String(value.to_string())
    }
}

impl From<&EntityId> for EntityId {
    fn from(value: &EntityId) -> Self {
        value.clone()
    }
}

impl From<EntityId> for Value {
    fn from(id: EntityId) -> Self {
        id.to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_untagged() {
        assert_eq!(serde_json::to_value(EntityId::from(7)).unwrap(), json!(7));
        assert_eq!(
            serde_json::to_value(EntityId::from("abc")).unwrap(),
            json!("abc")
        );
        let parsed: EntityId = serde_json::from_value(json!(12)).unwrap();
        assert_eq!(parsed, EntityId::Number(12));
    }

    #[test]
    fn from_value_rejects_non_ids() {
        assert_eq!(EntityId::from_value(&json!(1.5)), None);
        assert_eq!(EntityId::from_value(&json!(true)), None);
        assert_eq!(EntityId::from_value(&json!("x")), Some(EntityId::from("x")));
    }
}
