use heck::MixedCase;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::{Entity, ModelDefinition, SchemaError};

/// Kind of navigable association between two models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationType {
    BelongsTo,
    HasMany,
    HasOne,
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RelationType::BelongsTo => "belongsTo",
            RelationType::HasMany => "hasMany",
            RelationType::HasOne => "hasOne",
        })
    }
}

type ResolveFn = dyn Fn() -> Result<Arc<ModelDefinition>, SchemaError> + Send + Sync;

/// Deferred reference to a model definition.
///
/// Models may name each other cyclically (Customer has many Order, Order
/// belongs to Customer), so a relation stores a thunk instead of the target
/// definition itself. The thunk is only invoked once both sides are built.
#[derive(Clone)]
pub struct TypeResolver(Arc<ResolveFn>);

impl TypeResolver {
    pub fn new<F>(resolve: F) -> Self
    where
        F: Fn() -> Result<Arc<ModelDefinition>, SchemaError> + Send + Sync + 'static,
    {
        Self(Arc::new(resolve))
    }

    /// Resolve through the static definition of an entity type.
    pub fn of<E: Entity>() -> Self {
        Self::new(|| Ok(E::definition()))
    }

    /// Wrap an already built definition.
    pub fn from_definition(definition: Arc<ModelDefinition>) -> Self {
        Self::new(move || Ok(definition.clone()))
    }

    pub fn resolve(&self) -> Result<Arc<ModelDefinition>, SchemaError> {
        (self.0)()
    }
}

impl fmt::Debug for TypeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TypeResolver(..)")
    }
}

/// A declared relation from a source model to a target model.
///
/// `key_from`/`key_to` are optional at declaration time; relation factories
/// fill in the defaults once the target can be resolved.
#[derive(Debug, Clone)]
pub struct RelationDefinition {
    pub name: String,
    pub relation_type: RelationType,
    /// Name of the declaring model. Set when the relation is added to a model.
    pub source: String,
    pub target: TypeResolver,
    pub key_from: Option<String>,
    pub key_to: Option<String>,
    pub targets_many: bool,
}

impl RelationDefinition {
    fn new(name: impl Into<String>, relation_type: RelationType, target: TypeResolver) -> Self {
        Self {
            name: name.into(),
            relation_type,
            source: String::new(),
            target,
            key_from: None,
            key_to: None,
            targets_many: relation_type == RelationType::HasMany,
        }
    }

    pub fn belongs_to(name: impl Into<String>, target: TypeResolver) -> Self {
        Self::new(name, RelationType::BelongsTo, target)
    }

    pub fn has_many(name: impl Into<String>, target: TypeResolver) -> Self {
        Self::new(name, RelationType::HasMany, target)
    }

    pub fn has_one(name: impl Into<String>, target: TypeResolver) -> Self {
        Self::new(name, RelationType::HasOne, target)
    }

    pub fn key_from(mut self, key: impl Into<String>) -> Self {
        self.key_from = Some(key.into());
        self
    }

    pub fn key_to(mut self, key: impl Into<String>) -> Self {
        self.key_to = Some(key.into());
        self
    }

    pub fn target_model(&self) -> Result<Arc<ModelDefinition>, SchemaError> {
        self.target.resolve()
    }

    /// Foreign key a hasMany/hasOne target carries by default:
    /// `Customer` -> `customerId`.
    pub fn default_foreign_key(source_model: &str) -> String {
        format!("{}Id", source_model.to_mixed_case())
    }

    /// Relation name implied by a belongsTo foreign key property:
    /// `customerId` -> `customer`, `parentId` -> `parent`.
    pub fn name_from_foreign_key(property: &str) -> String {
        match property.strip_suffix("Id") {
            Some(stem) if !stem.is_empty() => stem.to_string(),
            _ => property.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keys() {
        assert_eq!(RelationDefinition::default_foreign_key("Customer"), "customerId");
        assert_eq!(
            RelationDefinition::default_foreign_key("OrderItem"),
            "orderItemId"
        );
        assert_eq!(RelationDefinition::name_from_foreign_key("parentId"), "parent");
        assert_eq!(
            RelationDefinition::name_from_foreign_key("shipment_id"),
            "shipment_id"
        );
        assert_eq!(RelationDefinition::name_from_foreign_key("Id"), "Id");
    }

    #[test]
    fn only_has_many_targets_many() {
        let target = TypeResolver::new(|| Err(SchemaError::UnknownModel("X".into())));
        assert!(RelationDefinition::has_many("orders", target.clone()).targets_many);
        assert!(!RelationDefinition::has_one("address", target.clone()).targets_many);
        assert!(!RelationDefinition::belongs_to("customer", target).targets_many);
    }
}
