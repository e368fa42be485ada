//! JSON model files (`models/<name>.model.json`).
//!
//! ```json
//! {
//!   "name": "Customer",
//!   "properties": {
//!     "id": {"type": "number", "id": true, "generated": true},
//!     "name": {"type": "string", "required": true}
//!   },
//!   "relations": {
//!     "orders": {"type": "hasMany", "model": "Order", "foreignKey": "customerId"}
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    ModelDefinition, ModelSettings, PropertyDefinition, PropertyType, RelationDefinition,
    RelationType, SchemaError, TypeResolver,
};

/// A relation entry of a model file. Targets are referenced by model name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationFile {
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    #[serde(alias = "target")]
    pub model: String,
    /// keyFrom for belongsTo, keyTo for hasMany/hasOne.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_to: Option<String>,
}

/// Serialized form of a [`ModelDefinition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    pub name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDefinition>,
    #[serde(default)]
    pub relations: BTreeMap<String, RelationFile>,
    #[serde(default)]
    pub settings: ModelSettings,
}

impl ModelFile {
    /// Build the definition, turning target model names into resolvers with
    /// `resolver_for`.
    pub fn into_definition<F>(self, resolver_for: F) -> Result<ModelDefinition, SchemaError>
    where
        F: Fn(&str) -> TypeResolver,
    {
        let mut definition = ModelDefinition::new(self.name).with_settings(self.settings);

        for (name, mut property) in self.properties {
            property.name = name;
            definition = definition.add_property(property);
        }

        for (name, relation) in self.relations {
            let target = resolver_for(&relation.model);
            let declared = match relation.relation_type {
                RelationType::BelongsTo => {
                    let key_from = relation
                        .key_from
                        .or(relation.foreign_key)
                        .unwrap_or_else(|| format!("{}Id", name));
                    if definition.property(&key_from).is_none() {
                        definition = definition
                            .add_property(PropertyDefinition::new(&key_from, PropertyType::Any));
                    }
                    let mut belongs_to =
                        RelationDefinition::belongs_to(&name, target).key_from(key_from);
                    belongs_to.key_to = relation.key_to;
                    belongs_to
                }
                kind => {
                    let mut declared = if kind == RelationType::HasMany {
                        RelationDefinition::has_many(&name, target)
                    } else {
                        RelationDefinition::has_one(&name, target)
                    };
                    declared.key_from = relation.key_from;
                    declared.key_to = relation.key_to.or(relation.foreign_key);
                    declared
                }
            };
            definition = definition.add_relation(declared);
        }

        definition.validate()?;
        Ok(definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn unresolved(name: &str) -> TypeResolver {
        let name = name.to_string();
        TypeResolver::new(move || Err(SchemaError::UnknownModel(name.clone())))
    }

    #[test]
    fn builds_definition_from_file() {
        let file: ModelFile = serde_json::from_value(json!({
            "name": "Order",
            "properties": {
                "id": {"type": "number", "id": true, "generated": true},
                "description": {"type": "string", "required": true}
            },
            "relations": {
                "customer": {"type": "belongsTo", "model": "Customer"},
                "shipment": {"type": "belongsTo", "model": "Shipment", "foreignKey": "shipment_id"}
            }
        }))
        .unwrap();

        let definition = file.into_definition(unresolved).unwrap();
        assert_eq!(definition.name(), "Order");
        assert_eq!(definition.id_name(), Some("id"));
        assert!(definition.is_strict());
        assert_eq!(
            definition.relation("customer").unwrap().key_from.as_deref(),
            Some("customerId")
        );
        assert!(definition.property("shipment_id").is_some());
        assert_eq!(
            definition.relation("shipment").unwrap().target_model().unwrap_err(),
            SchemaError::UnknownModel("Shipment".into())
        );
    }

    #[test]
    fn has_many_foreign_key_is_key_to() {
        let file: ModelFile = serde_json::from_value(json!({
            "name": "Shipment",
            "properties": {"id": {"type": "string", "id": true}},
            "relations": {
                "shipmentOrders": {
                    "type": "hasMany",
                    "target": "Order",
                    "foreignKey": "shipment_id"
                }
            },
            "settings": {"strict": false, "mongodb": {"collection": "shipments"}}
        }))
        .unwrap();

        let definition = file.into_definition(unresolved).unwrap();
        let relation = definition.relation("shipmentOrders").unwrap();
        assert_eq!(relation.key_to.as_deref(), Some("shipment_id"));
        assert!(relation.targets_many);
        assert!(!definition.is_strict());
        assert!(definition.settings().extra.contains_key("mongodb"));
    }
}
