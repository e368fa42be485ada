use async_trait::async_trait;
use loopback_schema::{Entity, EntityId, ModelDefinition, RelationDefinition};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::{
    create_belongs_to_accessor, create_has_many_repository_factory,
    create_has_one_repository_factory, values_equal, BelongsToAccessor, DataSource, Document,
    Filter, Getter, HasManyRepositoryFactory, HasOneRepositoryFactory, Record, RepositoryError,
    Result, Where,
};

/// Number of rows touched by a bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Count {
    pub count: u64,
}

impl From<u64> for Count {
    fn from(count: u64) -> Self {
        Self { count }
    }
}

/// CRUD operations on one entity model.
///
/// Input data is passed as JSON so callers can send partial documents;
/// results are deserialized into `T`.
#[async_trait]
pub trait EntityCrudRepository<T: Record>: Send + Sync {
    fn definition(&self) -> &Arc<ModelDefinition>;

    async fn create(&self, data: Value) -> Result<T>;

    async fn create_all(&self, data: Vec<Value>) -> Result<Vec<T>> {
        let mut created = Vec::with_capacity(data.len());
        for item in data {
            created.push(self.create(item).await?);
        }
        Ok(created)
    }

    async fn find(&self, filter: Option<Filter>) -> Result<Vec<T>>;

    async fn find_one(&self, filter: Option<Filter>) -> Result<Option<T>> {
        let filter = filter.unwrap_or_default().limit(1);
        Ok(self.find(Some(filter)).await?.into_iter().next())
    }

    /// Fails with `EntityNotFound` when no row has `id`.
    async fn find_by_id(&self, id: &EntityId, filter: Option<Filter>) -> Result<T>;

    async fn exists(&self, id: &EntityId) -> Result<bool>;

    async fn count(&self, where_: Option<Where>) -> Result<Count>;

    async fn update_all(&self, data: Value, where_: Option<Where>) -> Result<Count>;

    async fn update_by_id(&self, id: &EntityId, data: Value) -> Result<()>;

    async fn replace_by_id(&self, id: &EntityId, data: Value) -> Result<()>;

    /// Replace the stored row if `entity` carries an existing id, create it
    /// otherwise.
    async fn save(&self, entity: &T) -> Result<T>;

    async fn delete_all(&self, where_: Option<Where>) -> Result<Count>;

    async fn delete_by_id(&self, id: &EntityId) -> Result<()>;
}

/// Repository persisting `T` through a [`DataSource`].
///
/// `T` is either an [`Entity`] with a static definition or a plain
/// [`Document`] for models defined at runtime.
pub struct DefaultCrudRepository<T> {
    definition: Arc<ModelDefinition>,
    datasource: DataSource,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for DefaultCrudRepository<T> {
    fn clone(&self) -> Self {
        Self {
            definition: self.definition.clone(),
            datasource: self.datasource.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for DefaultCrudRepository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultCrudRepository")
            .field("model", &self.definition.name())
            .field("datasource", &self.datasource.name())
            .finish()
    }
}

impl<T: Entity> DefaultCrudRepository<T> {
    pub fn new(datasource: DataSource) -> Self {
        Self::with_definition(T::definition(), datasource)
    }
}

impl<T: Record> DefaultCrudRepository<T> {
    pub fn with_definition(definition: Arc<ModelDefinition>, datasource: DataSource) -> Self {
        Self {
            definition,
            datasource,
            _entity: PhantomData,
        }
    }

    pub fn datasource(&self) -> &DataSource {
        &self.datasource
    }

    fn entity_name(&self) -> &str {
        self.definition.name()
    }

    fn id_name(&self) -> Result<&str> {
        self.definition.id_name().ok_or_else(|| {
            RepositoryError::invalid_data(self.entity_name(), "model has no id property")
        })
    }

    fn id_where(&self, id: &EntityId) -> Result<Where> {
        Ok(Where::eq(self.id_name()?, id.to_value()))
    }

    /// Check `data` against the model: navigational and (for strict models)
    /// undeclared properties are rejected, declared properties must have
    /// the right type, and unless `partial` required properties must be set.
    fn to_document(&self, data: Value, partial: bool) -> Result<Document> {
        let document = match data {
            Value::Object(document) => document,
            other => {
                return Err(RepositoryError::invalid_data(
                    self.entity_name(),
                    format!("expected a JSON object, got {}", other),
                ))
            }
        };

        let mut details = Vec::new();
        for (key, value) in &document {
            if self.definition.relation(key).is_some() {
                return Err(RepositoryError::UndefinedProperty {
                    entity_name: self.entity_name().to_string(),
                    property: key.clone(),
                });
            }
            match self.definition.property(key) {
                Some(property) if !property.accepts(value) => {
                    let expected = format!("{:?}", property.ty).to_lowercase();
                    details.push(format!("`{}` is not a valid {}", key, expected));
                }
                Some(_) => {}
                None if self.definition.is_strict() => {
                    return Err(RepositoryError::UndefinedProperty {
                        entity_name: self.entity_name().to_string(),
                        property: key.clone(),
                    });
                }
                None => {}
            }
        }

        if !partial {
            for property in self.definition.properties() {
                let missing = document.get(&property.name).map_or(true, Value::is_null);
                if property.required && missing && property.default.is_none() {
                    details.push(format!("`{}` can't be blank", property.name));
                }
            }
        }

        if details.is_empty() {
            Ok(document)
        } else {
            Err(RepositoryError::Validation {
                entity_name: self.entity_name().to_string(),
                details,
            })
        }
    }

    /// Reject data that tries to move a row to another id.
    fn check_id_unchanged(&self, data: &Document, id: Option<&EntityId>) -> Result<()> {
        let id_name = self.id_name()?;
        match (data.get(id_name), id) {
            (None, _) | (Some(Value::Null), _) => Ok(()),
            (Some(given), Some(id)) if values_equal(given, &id.to_value()) => Ok(()),
            (Some(_), _) => Err(RepositoryError::invalid_data(
                self.entity_name(),
                format!("`{}` cannot be changed", id_name),
            )),
        }
    }

    fn to_entity(&self, row: Document) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(row))?)
    }

    fn relation(&self, name: &str) -> Result<&RelationDefinition> {
        self.definition
            .relation(name)
            .ok_or_else(|| RepositoryError::InvalidRelation {
                relation: name.to_string(),
                source_model: self.entity_name().to_string(),
                reason: "relation is not defined".to_string(),
            })
    }

    /// The relation `name` with `key_from` defaulted to this model's id.
    fn relation_from_source(&self, name: &str) -> Result<RelationDefinition> {
        let mut relation = self.relation(name)?.clone();
        if relation.key_from.is_none() {
            let id_name = self.definition.id_name().ok_or_else(|| RepositoryError::InvalidRelation {
                relation: name.to_string(),
                source_model: self.entity_name().to_string(),
                reason: "source model must define an id property".to_string(),
            })?;
            relation.key_from = Some(id_name.to_string());
        }
        Ok(relation)
    }

    /// Accessor factory for the hasMany relation `name` of this model.
    pub fn create_has_many_repository_factory_for<Target: Record>(
        &self,
        name: &str,
        target: Getter<dyn EntityCrudRepository<Target>>,
    ) -> Result<HasManyRepositoryFactory<Target>> {
        create_has_many_repository_factory(&self.relation_from_source(name)?, target)
    }

    pub fn create_has_one_repository_factory_for<Target: Record>(
        &self,
        name: &str,
        target: Getter<dyn EntityCrudRepository<Target>>,
    ) -> Result<HasOneRepositoryFactory<Target>> {
        create_has_one_repository_factory(&self.relation_from_source(name)?, target)
    }

    pub fn create_belongs_to_accessor_for<Target: Record>(
        self: &Arc<Self>,
        name: &str,
        target: Getter<dyn EntityCrudRepository<Target>>,
    ) -> Result<BelongsToAccessor<Target, T>> {
        let source: Arc<dyn EntityCrudRepository<T>> = self.clone();
        create_belongs_to_accessor(self.relation(name)?, target, source)
    }
}

#[async_trait]
impl<T: Record> EntityCrudRepository<T> for DefaultCrudRepository<T> {
    fn definition(&self) -> &Arc<ModelDefinition> {
        &self.definition
    }

    async fn create(&self, data: Value) -> Result<T> {
        let document = self.to_document(data, false)?;
        let row = self
            .datasource
            .connector()
            .create(&self.definition, document)
            .await?;
        tracing::debug!(model = %self.entity_name(), "created");
        self.to_entity(row)
    }

    async fn find(&self, filter: Option<Filter>) -> Result<Vec<T>> {
        let filter = filter.unwrap_or_default();
        let rows = self
            .datasource
            .connector()
            .find(&self.definition, &filter)
            .await?;
        rows.into_iter().map(|row| self.to_entity(row)).collect()
    }

    async fn find_by_id(&self, id: &EntityId, filter: Option<Filter>) -> Result<T> {
        let mut filter = filter.unwrap_or_default();
        let by_id = self.id_where(id)?;
        filter.where_ = Some(by_id.impose(filter.where_.take().unwrap_or_default()));
        let rows = self
            .datasource
            .connector()
            .find(&self.definition, &filter.limit(1))
            .await?;
        match rows.into_iter().next() {
            Some(row) => self.to_entity(row),
            None => Err(RepositoryError::entity_not_found(self.entity_name(), id)),
        }
    }

    async fn exists(&self, id: &EntityId) -> Result<bool> {
        let by_id = self.id_where(id)?;
        let count = self
            .datasource
            .connector()
            .count(&self.definition, Some(&by_id))
            .await?;
        Ok(count > 0)
    }

    async fn count(&self, where_: Option<Where>) -> Result<Count> {
        let count = self
            .datasource
            .connector()
            .count(&self.definition, where_.as_ref())
            .await?;
        Ok(count.into())
    }

    async fn update_all(&self, data: Value, where_: Option<Where>) -> Result<Count> {
        let document = self.to_document(data, true)?;
        self.check_id_unchanged(&document, None)?;
        let count = self
            .datasource
            .connector()
            .update_all(&self.definition, document, where_.as_ref())
            .await?;
        tracing::debug!(model = %self.entity_name(), count, "updated");
        Ok(count.into())
    }

    async fn update_by_id(&self, id: &EntityId, data: Value) -> Result<()> {
        let mut document = self.to_document(data, true)?;
        self.check_id_unchanged(&document, Some(id))?;
        document.remove(self.id_name()?);
        let by_id = self.id_where(id)?;
        let count = self
            .datasource
            .connector()
            .update_all(&self.definition, document, Some(&by_id))
            .await?;
        if count == 0 {
            return Err(RepositoryError::entity_not_found(self.entity_name(), id));
        }
        Ok(())
    }

    async fn replace_by_id(&self, id: &EntityId, data: Value) -> Result<()> {
        let document = self.to_document(data, false)?;
        self.check_id_unchanged(&document, Some(id))?;
        let replaced = self
            .datasource
            .connector()
            .replace_by_id(&self.definition, id, document)
            .await?;
        if !replaced {
            return Err(RepositoryError::entity_not_found(self.entity_name(), id));
        }
        Ok(())
    }

    async fn save(&self, entity: &T) -> Result<T> {
        let data = serde_json::to_value(entity)?;
        let id = data
            .get(self.id_name()?)
            .and_then(EntityId::from_value);
        if let Some(id) = id {
            if self.exists(&id).await? {
                self.replace_by_id(&id, data).await?;
                return self.find_by_id(&id, None).await;
            }
        }
        self.create(data).await
    }

    async fn delete_all(&self, where_: Option<Where>) -> Result<Count> {
        let count = self
            .datasource
            .connector()
            .delete_all(&self.definition, where_.as_ref())
            .await?;
        tracing::debug!(model = %self.entity_name(), count, "deleted");
        Ok(count.into())
    }

    async fn delete_by_id(&self, id: &EntityId) -> Result<()> {
        let by_id = self.id_where(id)?;
        let count = self
            .datasource
            .connector()
            .delete_all(&self.definition, Some(&by_id))
            .await?;
        if count == 0 {
            return Err(RepositoryError::entity_not_found(self.entity_name(), id));
        }
        Ok(())
    }
}
