use async_trait::async_trait;
use loopback_schema::{EntityId, RelationDefinition};
use serde_json::Value;
use std::fmt;

use crate::{
    constrain_data_object, constrain_filter, constrain_where, constraint_where,
    reject_foreign_key_change, resolve_has_one_metadata, Count, Document, EntityCrudRepository,
    Filter, Getter, Record, RepositoryError, ResolvedRelation, Result,
};

/// CRUD on the single target belonging to one source instance.
#[async_trait]
pub trait HasOneRepository<T: Record>: Send + Sync {
    /// Fails with `RelatedEntityNotFound` when there is no target. A `where`
    /// in `filter` is ignored; only `fields` and `order` apply.
    async fn get(&self, filter: Option<Filter>) -> Result<T>;

    /// Fails with `DuplicateRelatedEntity` when a target already exists.
    async fn create(&self, data: Value) -> Result<T>;

    async fn patch(&self, data: Value) -> Result<Count>;

    async fn delete(&self) -> Result<Count>;
}

pub struct DefaultHasOneRepository<T: Record> {
    target: Getter<dyn EntityCrudRepository<T>>,
    constraint: Document,
    entity_name: String,
}

impl<T: Record> DefaultHasOneRepository<T> {
    pub fn new(
        target: Getter<dyn EntityCrudRepository<T>>,
        constraint: Document,
        entity_name: impl Into<String>,
    ) -> Self {
        Self {
            target,
            constraint,
            entity_name: entity_name.into(),
        }
    }

    fn foreign_key(&self) -> (String, String) {
        self.constraint
            .iter()
            .next()
            .map(|(key, value)| {
                let id = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), id)
            })
            .unwrap_or_default()
    }
}

impl<T: Record> fmt::Debug for DefaultHasOneRepository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultHasOneRepository")
            .field("entity", &self.entity_name)
            .field("constraint", &self.constraint)
            .finish()
    }
}

#[async_trait]
impl<T: Record> HasOneRepository<T> for DefaultHasOneRepository<T> {
    async fn get(&self, filter: Option<Filter>) -> Result<T> {
        let filter = filter.map(|filter| Filter {
            where_: None,
            ..filter
        });
        let filter = constrain_filter(filter, &self.constraint).limit(1);
        let found = self.target.get().await?.find(Some(filter)).await?;
        found.into_iter().next().ok_or_else(|| {
            let (key, id) = self.foreign_key();
            RepositoryError::RelatedEntityNotFound {
                entity_name: self.entity_name.clone(),
                key,
                id,
            }
        })
    }

    // Check-then-insert: two concurrent creates for the same key can both pass.
    async fn create(&self, data: Value) -> Result<T> {
        let data = constrain_data_object(data, &self.constraint)?;
        let target = self.target.get().await?;
        let existing = target.count(Some(constraint_where(&self.constraint))).await?;
        if existing.count > 0 {
            let (property, _) = self.foreign_key();
            return Err(RepositoryError::DuplicateRelatedEntity {
                entity_name: self.entity_name.clone(),
                property,
            });
        }
        target.create(data).await
    }

    async fn patch(&self, data: Value) -> Result<Count> {
        reject_foreign_key_change(&data, &self.constraint)?;
        let where_ = constrain_where(None, &self.constraint);
        self.target.get().await?.update_all(data, Some(where_)).await
    }

    async fn delete(&self) -> Result<Count> {
        let where_ = constrain_where(None, &self.constraint);
        self.target.get().await?.delete_all(Some(where_)).await
    }
}

/// Builds [`DefaultHasOneRepository`]s for one relation.
pub struct HasOneRepositoryFactory<T: Record> {
    relation: ResolvedRelation,
    target: Getter<dyn EntityCrudRepository<T>>,
}

impl<T: Record> Clone for HasOneRepositoryFactory<T> {
    fn clone(&self) -> Self {
        Self {
            relation: self.relation.clone(),
            target: self.target.clone(),
        }
    }
}

impl<T: Record> fmt::Debug for HasOneRepositoryFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HasOneRepositoryFactory")
            .field("relation", &self.relation.name)
            .field("key_to", &self.relation.key_to)
            .finish()
    }
}

impl<T: Record> HasOneRepositoryFactory<T> {
    pub fn relation(&self) -> &ResolvedRelation {
        &self.relation
    }

    pub fn of(&self, source_id: impl Into<EntityId>) -> DefaultHasOneRepository<T> {
        let mut constraint = Document::new();
        constraint.insert(self.relation.key_to.clone(), source_id.into().to_value());
        DefaultHasOneRepository::new(
            self.target.clone(),
            constraint,
            self.relation.target.name(),
        )
    }
}

pub fn create_has_one_repository_factory<T: Record>(
    relation: &RelationDefinition,
    target: Getter<dyn EntityCrudRepository<T>>,
) -> Result<HasOneRepositoryFactory<T>> {
    let relation = resolve_has_one_metadata(relation)?;
    tracing::debug!(
        relation = %relation.name,
        source = %relation.source_model,
        target = %relation.target.name(),
        key_to = %relation.key_to,
        "hasOne factory created"
    );
    Ok(HasOneRepositoryFactory { relation, target })
}
