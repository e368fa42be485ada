use async_trait::async_trait;
use loopback_schema::{EntityId, RelationDefinition};
use serde_json::Value;
use std::fmt;

use crate::{
    constrain_data_object, constrain_filter, constrain_where, reject_foreign_key_change,
    resolve_has_many_metadata, Count, Document, EntityCrudRepository, Filter, Getter, Record,
    ResolvedRelation, Result, Where,
};

/// CRUD on the targets belonging to one source instance.
#[async_trait]
pub trait HasManyRepository<T: Record>: Send + Sync {
    /// Create a target with the foreign key set to the source id.
    async fn create(&self, data: Value) -> Result<T>;

    async fn find(&self, filter: Option<Filter>) -> Result<Vec<T>>;

    /// Update matching targets. `data` may not contain the foreign key.
    async fn patch(&self, data: Value, where_: Option<Where>) -> Result<Count>;

    async fn delete(&self, where_: Option<Where>) -> Result<Count>;
}

/// [`HasManyRepository`] scoped by a constraint on the target repository.
pub struct DefaultHasManyRepository<T: Record> {
    target: Getter<dyn EntityCrudRepository<T>>,
    constraint: Document,
}

impl<T: Record> DefaultHasManyRepository<T> {
    pub fn new(target: Getter<dyn EntityCrudRepository<T>>, constraint: Document) -> Self {
        Self { target, constraint }
    }

    pub fn constraint(&self) -> &Document {
        &self.constraint
    }
}

impl<T: Record> fmt::Debug for DefaultHasManyRepository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultHasManyRepository")
            .field("constraint", &self.constraint)
            .finish()
    }
}

#[async_trait]
impl<T: Record> HasManyRepository<T> for DefaultHasManyRepository<T> {
    async fn create(&self, data: Value) -> Result<T> {
        let data = constrain_data_object(data, &self.constraint)?;
        self.target.get().await?.create(data).await
    }

    async fn find(&self, filter: Option<Filter>) -> Result<Vec<T>> {
        let filter = constrain_filter(filter, &self.constraint);
        self.target.get().await?.find(Some(filter)).await
    }

    async fn patch(&self, data: Value, where_: Option<Where>) -> Result<Count> {
        reject_foreign_key_change(&data, &self.constraint)?;
        let where_ = constrain_where(where_, &self.constraint);
        self.target.get().await?.update_all(data, Some(where_)).await
    }

    async fn delete(&self, where_: Option<Where>) -> Result<Count> {
        let where_ = constrain_where(where_, &self.constraint);
        self.target.get().await?.delete_all(Some(where_)).await
    }
}

/// Builds [`DefaultHasManyRepository`]s for one relation.
pub struct HasManyRepositoryFactory<T: Record> {
    relation: ResolvedRelation,
    target: Getter<dyn EntityCrudRepository<T>>,
}

impl<T: Record> Clone for HasManyRepositoryFactory<T> {
    fn clone(&self) -> Self {
        Self {
            relation: self.relation.clone(),
            target: self.target.clone(),
        }
    }
}

impl<T: Record> fmt::Debug for HasManyRepositoryFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HasManyRepositoryFactory")
            .field("relation", &self.relation.name)
            .field("key_to", &self.relation.key_to)
            .finish()
    }
}

impl<T: Record> HasManyRepositoryFactory<T> {
    pub fn relation(&self) -> &ResolvedRelation {
        &self.relation
    }

    /// Repository of the targets of source instance `source_id`.
    pub fn of(&self, source_id: impl Into<EntityId>) -> DefaultHasManyRepository<T> {
        let mut constraint = Document::new();
        constraint.insert(self.relation.key_to.clone(), source_id.into().to_value());
        DefaultHasManyRepository::new(self.target.clone(), constraint)
    }
}

/// Resolve a hasMany relation into a factory.
///
/// ```ignore
/// let orders = create_has_many_repository_factory(
///     Customer::definition().relation("orders").unwrap(),
///     order_slot.getter(),
/// )?;
/// orders.of(customer.id).create(json!({"description": "pizza"})).await?;
/// ```
pub fn create_has_many_repository_factory<T: Record>(
    relation: &RelationDefinition,
    target: Getter<dyn EntityCrudRepository<T>>,
) -> Result<HasManyRepositoryFactory<T>> {
    let relation = resolve_has_many_metadata(relation)?;
    tracing::debug!(
        relation = %relation.name,
        source = %relation.source_model,
        target = %relation.target.name(),
        key_to = %relation.key_to,
        "hasMany factory created"
    );
    Ok(HasManyRepositoryFactory { relation, target })
}
