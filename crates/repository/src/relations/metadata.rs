use loopback_schema::{ModelDefinition, RelationDefinition, RelationType};
use std::sync::Arc;

use crate::{RepositoryError, Result};

/// A relation with its target resolved and both keys filled in.
#[derive(Debug, Clone)]
pub struct ResolvedRelation {
    pub name: String,
    pub relation_type: RelationType,
    pub source_model: String,
    pub target: Arc<ModelDefinition>,
    pub key_from: String,
    pub key_to: String,
}

fn invalid(relation: &RelationDefinition, reason: impl Into<String>) -> RepositoryError {
    RepositoryError::InvalidRelation {
        relation: relation.name.clone(),
        source_model: relation.source.clone(),
        reason: reason.into(),
    }
}

fn resolve_target(
    relation: &RelationDefinition,
    expected: RelationType,
) -> Result<Arc<ModelDefinition>> {
    if relation.relation_type != expected {
        return Err(invalid(
            relation,
            format!("{} relation cannot be used as {}", relation.relation_type, expected),
        ));
    }
    relation
        .target_model()
        .map_err(|e| invalid(relation, format!("target model cannot be resolved: {}", e)))
}

/// `key_from` is the declared foreign key property, `key_to` defaults to
/// the target's id property.
pub fn resolve_belongs_to_metadata(relation: &RelationDefinition) -> Result<ResolvedRelation> {
    let target = resolve_target(relation, RelationType::BelongsTo)?;
    let key_from = relation
        .key_from
        .clone()
        .ok_or_else(|| invalid(relation, "source model must define the foreign key property"))?;
    let key_to = match &relation.key_to {
        Some(key_to) => key_to.clone(),
        None => target
            .id_name()
            .ok_or_else(|| {
                invalid(
                    relation,
                    format!(
                        "target model {} does not have any primary key (id property)",
                        target.name()
                    ),
                )
            })?
            .to_string(),
    };
    Ok(ResolvedRelation {
        name: relation.name.clone(),
        relation_type: relation.relation_type,
        source_model: relation.source.clone(),
        target,
        key_from,
        key_to,
    })
}

fn resolve_has_metadata(
    relation: &RelationDefinition,
    expected: RelationType,
) -> Result<ResolvedRelation> {
    let target = resolve_target(relation, expected)?;
    let key_to = relation
        .key_to
        .clone()
        .unwrap_or_else(|| RelationDefinition::default_foreign_key(&relation.source));
    if target.property(&key_to).is_none() {
        return Err(invalid(
            relation,
            format!(
                "target model {} is missing definition of foreign key {}",
                target.name(),
                key_to
            ),
        ));
    }
    Ok(ResolvedRelation {
        name: relation.name.clone(),
        relation_type: relation.relation_type,
        source_model: relation.source.clone(),
        target,
        key_from: relation.key_from.clone().unwrap_or_else(|| "id".to_string()),
        key_to,
    })
}

/// `key_to` defaults to `camelCase(source) + "Id"` and must be declared on
/// the target.
pub fn resolve_has_many_metadata(relation: &RelationDefinition) -> Result<ResolvedRelation> {
    resolve_has_metadata(relation, RelationType::HasMany)
}

pub fn resolve_has_one_metadata(relation: &RelationDefinition) -> Result<ResolvedRelation> {
    resolve_has_metadata(relation, RelationType::HasOne)
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopback_schema::{PropertyDefinition, PropertyType, SchemaError, TypeResolver};

    fn order() -> Arc<ModelDefinition> {
        ModelDefinition::new("Order")
            .add_property(PropertyDefinition::id("id", PropertyType::Number))
            .add_property(PropertyDefinition::new("customerId", PropertyType::Number))
            .build()
    }

    fn customer() -> Arc<ModelDefinition> {
        ModelDefinition::new("Customer")
            .add_property(PropertyDefinition::id("id", PropertyType::Number))
            .has_many("orders", TypeResolver::from_definition(order()))
            .has_one("address", TypeResolver::from_definition(order()))
            .build()
    }

    #[test]
    fn has_many_defaults_keys() {
        let customer = customer();
        let resolved = resolve_has_many_metadata(customer.relation("orders").unwrap()).unwrap();
        assert_eq!(resolved.key_to, "customerId");
        assert_eq!(resolved.key_from, "id");
        assert_eq!(resolved.target.name(), "Order");
        assert_eq!(resolved.source_model, "Customer");
    }

    #[test]
    fn relation_type_must_match() {
        let customer = customer();
        let err = resolve_has_many_metadata(customer.relation("address").unwrap()).unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::InvalidRelation { ref reason, .. }
                if reason.contains("hasOne relation cannot be used as hasMany")
        ));
    }

    #[test]
    fn target_must_declare_foreign_key() {
        let relation =
            RelationDefinition::has_many("orders", TypeResolver::from_definition(order()))
                .key_to("ownerId");
        let err = resolve_has_many_metadata(&relation).unwrap_err();
        assert!(err.to_string().contains("missing definition of foreign key ownerId"));
    }

    #[test]
    fn unresolvable_target() {
        let relation = RelationDefinition::belongs_to(
            "customer",
            TypeResolver::new(|| Err(SchemaError::UnknownModel("Customer".into()))),
        )
        .key_from("customerId");
        let err = resolve_belongs_to_metadata(&relation).unwrap_err();
        assert!(err.to_string().contains("target model cannot be resolved"));
    }

    #[test]
    fn belongs_to_targets_id() {
        let relation =
            RelationDefinition::belongs_to("customer", TypeResolver::from_definition(customer()))
                .key_from("customerId");
        let resolved = resolve_belongs_to_metadata(&relation).unwrap();
        assert_eq!(resolved.key_from, "customerId");
        assert_eq!(resolved.key_to, "id");
    }
}
