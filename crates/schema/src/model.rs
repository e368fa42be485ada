use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{PropertyDefinition, PropertyType, RelationDefinition, SchemaError, TypeResolver};

/// Whether a model carries identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Value object without an id property. Cannot back a repository.
    Model,
    Entity,
}

fn default_strict() -> bool {
    true
}

/// Model level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Reject properties that are not declared on the model.
    #[serde(default = "default_strict")]
    pub strict: bool,
    /// Connector or application specific settings, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            strict: true,
            extra: Map::new(),
        }
    }
}

/// Immutable description of a model: its properties, relations and settings.
///
/// Built once at startup with the consuming builder methods and shared as
/// `Arc<ModelDefinition>`.
#[derive(Debug, Clone)]
pub struct ModelDefinition {
    name: String,
    properties: Vec<PropertyDefinition>,
    relations: BTreeMap<String, RelationDefinition>,
    settings: ModelSettings,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            relations: BTreeMap::new(),
            settings: ModelSettings::default(),
        }
    }

    /// Add a property, replacing an earlier declaration with the same name.
    pub fn add_property(mut self, property: PropertyDefinition) -> Self {
        match self.properties.iter_mut().find(|p| p.name == property.name) {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
        self
    }

    /// Add a relation. The relation's `source` is set to this model.
    pub fn add_relation(mut self, mut relation: RelationDefinition) -> Self {
        relation.source = self.name.clone();
        self.relations.insert(relation.name.clone(), relation);
        self
    }

    /// Declare a foreign key property and the belongsTo relation it implies.
    ///
    /// `belongs_to("customerId", ..)` adds the `customerId` property and a
    /// relation named `customer`.
    pub fn belongs_to(self, foreign_key: &str, target: TypeResolver) -> Self {
        let name = RelationDefinition::name_from_foreign_key(foreign_key);
        self.belongs_to_named(foreign_key, &name, target)
    }

    /// Like [`belongs_to`](Self::belongs_to) with an explicit relation name,
    /// for foreign keys that do not follow the `<name>Id` convention.
    pub fn belongs_to_named(self, foreign_key: &str, name: &str, target: TypeResolver) -> Self {
        let with_key = if self.property(foreign_key).is_some() {
            self
        } else {
            self.add_property(PropertyDefinition::new(foreign_key, PropertyType::Any))
        };
        with_key.add_relation(RelationDefinition::belongs_to(name, target).key_from(foreign_key))
    }

    pub fn has_many(self, name: &str, target: TypeResolver) -> Self {
        self.add_relation(RelationDefinition::has_many(name, target))
    }

    pub fn has_one(self, name: &str, target: TypeResolver) -> Self {
        self.add_relation(RelationDefinition::has_one(name, target))
    }

    pub fn with_settings(mut self, settings: ModelSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.settings.strict = strict;
        self
    }

    /// Check internal consistency: a relation may not reuse a property name,
    /// otherwise navigational data would be indistinguishable from stored data.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for relation in self.relations.keys() {
            if self.property(relation).is_some() {
                return Err(SchemaError::RelationShadowsProperty {
                    model: self.name.clone(),
                    relation: relation.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &[PropertyDefinition] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn relations(&self) -> &BTreeMap<String, RelationDefinition> {
        &self.relations
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDefinition> {
        self.relations.get(name)
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn is_strict(&self) -> bool {
        self.settings.strict
    }

    pub fn id_property(&self) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|p| p.id)
    }

    pub fn id_name(&self) -> Option<&str> {
        self.id_property().map(|p| p.name.as_str())
    }

    pub fn kind(&self) -> ModelKind {
        if self.id_property().is_some() {
            ModelKind::Entity
        } else {
            ModelKind::Model
        }
    }

    pub fn is_entity(&self) -> bool {
        self.kind() == ModelKind::Entity
    }
}

/// A Rust type backed by a static model definition.
///
/// Instances travel to and from the datasource as JSON, so field names must
/// serialize to the property names of the definition.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn definition() -> Arc<ModelDefinition>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn order() -> ModelDefinition {
        let customer = TypeResolver::new(|| Ok(ModelDefinition::new("Customer").build()));
        ModelDefinition::new("Order")
            .add_property(PropertyDefinition::id("id", PropertyType::Number))
            .add_property(PropertyDefinition::new("description", PropertyType::String).required())
            .belongs_to("customerId", customer.clone())
            .belongs_to_named("shipment_id", "shipment", customer)
    }

    #[test]
    fn belongs_to_declares_key_and_relation() {
        let order = order();
        let customer = order.relation("customer").unwrap();
        assert_eq!(customer.key_from.as_deref(), Some("customerId"));
        assert_eq!(customer.source, "Order");
        assert!(order.property("customerId").is_some());

        let shipment = order.relation("shipment").unwrap();
        assert_eq!(shipment.key_from.as_deref(), Some("shipment_id"));
    }

    #[test]
    fn kind_follows_id_property() {
        assert_eq!(order().kind(), ModelKind::Entity);
        assert_eq!(order().id_name(), Some("id"));
        let address = ModelDefinition::new("Address")
            .add_property(PropertyDefinition::new("street", PropertyType::String));
        assert_eq!(address.kind(), ModelKind::Model);
    }

    #[test]
    fn add_property_replaces_existing() {
        let model = ModelDefinition::new("Product")
            .add_property(PropertyDefinition::new("name", PropertyType::Any))
            .add_property(PropertyDefinition::new("name", PropertyType::String));
        assert_eq!(model.properties().len(), 1);
        assert_eq!(model.property("name").unwrap().ty, PropertyType::String);
    }

    #[test]
    fn relation_may_not_shadow_property() {
        let target = TypeResolver::new(|| Ok(ModelDefinition::new("Order").build()));
        let model = ModelDefinition::new("Customer")
            .add_property(PropertyDefinition::new("orders", PropertyType::Array))
            .has_many("orders", target);
        assert_eq!(
            model.validate(),
            Err(SchemaError::RelationShadowsProperty {
                model: "Customer".into(),
                relation: "orders".into()
            })
        );
    }
}
