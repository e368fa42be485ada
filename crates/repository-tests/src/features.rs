use loopback_schema::{EntityId, PropertyType};

/// What the connector under test supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrudFeatures {
    /// Type of generated ids.
    pub id_type: PropertyType,
    /// Whether non-strict models keep properties they do not declare.
    pub free_form_properties: bool,
}

impl CrudFeatures {
    pub fn number() -> Self {
        Self {
            id_type: PropertyType::Number,
            free_form_properties: true,
        }
    }

    pub fn string() -> Self {
        Self {
            id_type: PropertyType::String,
            ..Self::number()
        }
    }

    /// An id of the same kind as `id` that is not `id`.
    pub fn other_id(&self, id: &EntityId) -> EntityId {
        match id {
            EntityId::Number(n) => EntityId::Number(n + 1),
            EntityId::String(s) => EntityId::String(format!("{}-other", s)),
        }
    }

    /// An id no fixture row is ever stored under.
    pub fn missing_id(&self) -> EntityId {
        match self.id_type {
            PropertyType::String => EntityId::String("does-not-exist".to_string()),
            _ => EntityId::Number(999),
        }
    }
}

impl Default for CrudFeatures {
    fn default() -> Self {
        Self::number()
    }
}
