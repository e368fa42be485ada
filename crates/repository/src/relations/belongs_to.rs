use loopback_schema::{EntityId, RelationDefinition};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::{
    resolve_belongs_to_metadata, EntityCrudRepository, Filter, Getter, Record, RepositoryError,
    ResolvedRelation, Result, Where,
};

/// Navigates from a source instance to the one target its foreign key
/// points at.
pub struct BelongsToAccessor<Target: Record, Source: Record> {
    relation: ResolvedRelation,
    target: Getter<dyn EntityCrudRepository<Target>>,
    source: Arc<dyn EntityCrudRepository<Source>>,
}

impl<Target: Record, Source: Record> fmt::Debug for BelongsToAccessor<Target, Source> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BelongsToAccessor")
            .field("relation", &self.relation.name)
            .field("key_from", &self.relation.key_from)
            .field("key_to", &self.relation.key_to)
            .finish()
    }
}

/// Build the accessor for a belongsTo relation declared on the source model.
///
/// ```ignore
/// let customer_of = create_belongs_to_accessor(
///     Order::definition().relation("customer").unwrap(),
///     customers.getter(),
///     order_repository.clone(),
/// )?;
/// let customer = customer_of.get(&order_id).await?;
/// ```
pub fn create_belongs_to_accessor<Target: Record, Source: Record>(
    relation: &RelationDefinition,
    target: Getter<dyn EntityCrudRepository<Target>>,
    source: Arc<dyn EntityCrudRepository<Source>>,
) -> Result<BelongsToAccessor<Target, Source>> {
    let relation = resolve_belongs_to_metadata(relation)?;
    tracing::debug!(
        relation = %relation.name,
        source = %relation.source_model,
        target = %relation.target.name(),
        "belongsTo accessor created"
    );
    Ok(BelongsToAccessor {
        relation,
        target,
        source,
    })
}

impl<Target: Record, Source: Record> BelongsToAccessor<Target, Source> {
    pub fn relation(&self) -> &ResolvedRelation {
        &self.relation
    }

    fn not_found(&self, key: &Value) -> RepositoryError {
        RepositoryError::RelatedEntityNotFound {
            entity_name: self.relation.target.name().to_string(),
            key: self.relation.key_to.clone(),
            id: match key {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        }
    }

    /// The target of the source instance `source_id`.
    ///
    /// Fails with `EntityNotFound` when the source is missing and with
    /// `RelatedEntityNotFound` when its foreign key is unset or dangling.
    pub async fn get(&self, source_id: &EntityId) -> Result<Target> {
        let source = self.source.find_by_id(source_id, None).await?;
        let source = serde_json::to_value(&source)?;
        let foreign_key = source
            .get(&self.relation.key_from)
            .cloned()
            .unwrap_or(Value::Null);
        if foreign_key.is_null() {
            return Err(self.not_found(&foreign_key));
        }

        let target = self.target.get().await?;
        let filter = Filter::new()
            .where_(Where::eq(self.relation.key_to.clone(), foreign_key.clone()))
            .limit(1);
        target
            .find(Some(filter))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| self.not_found(&foreign_key))
    }
}
