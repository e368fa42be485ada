use async_trait::async_trait;
use loopback_schema::{EntityId, ModelDefinition, PropertyType};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{values_equal, Connector, Document, Filter, RepositoryError, Result, Where};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Collection {
    next_id: i64,
    rows: Vec<Document>,
}

impl Default for Collection {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: Vec::new(),
        }
    }
}

type Collections = BTreeMap<String, Collection>;

/// Reference connector keeping every model in memory.
///
/// Numeric and `any` ids come from a per-model sequence, string ids are
/// UUID v4. With a backing file the whole store is rewritten after each
/// mutation and loaded again on startup.
#[derive(Debug, Default)]
pub struct MemoryConnector {
    collections: RwLock<Collections>,
    file: Option<PathBuf>,
    // Serializes file-backed mutations from snapshot through rename.
    persist_lock: Mutex<()>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist to `file`, loading its contents if it already exists.
    pub async fn with_file(file: impl Into<PathBuf>) -> Result<Self> {
        let file = file.into();
        let collections = match tokio::fs::read_to_string(&file).await {
            Ok(text) if !text.trim().is_empty() => serde_json::from_str(&text)?,
            Ok(_) => Collections::new(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Collections::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(file = %file.display(), "memory connector loaded");
        Ok(Self {
            collections: RwLock::new(collections),
            file: Some(file),
            persist_lock: Mutex::new(()),
        })
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Apply `op` to the store.
    ///
    /// Without a file this happens in place under the write lock. With one,
    /// `op` runs on a staged copy that only replaces the store once it has
    /// been written out, so a failed write leaves both unchanged.
    async fn mutate<R>(&self, op: impl FnOnce(&mut Collections) -> Result<R>) -> Result<R> {
        let Some(file) = &self.file else {
            let mut collections = self.collections.write();
            return op(&mut collections);
        };

        let _guard = self.persist_lock.lock().await;
        let mut staged = self.collections.read().clone();
        let result = op(&mut staged)?;
        let snapshot = serde_json::to_string_pretty(&staged)?;
        write_atomically(file, &snapshot).await?;
        *self.collections.write() = staged;
        Ok(result)
    }

    fn read<R>(&self, model: &ModelDefinition, op: impl FnOnce(&[Document]) -> R) -> R {
        let collections = self.collections.read();
        match collections.get(model.name()) {
            Some(collection) => op(&collection.rows),
            None => op(&[]),
        }
    }
}

/// Write through a sibling temp file renamed over `file`.
async fn write_atomically(file: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut staging = file.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);
    tokio::fs::write(&staging, contents).await?;
    tokio::fs::rename(&staging, file).await?;
    Ok(())
}

fn matches(where_: Option<&Where>, row: &Document) -> bool {
    where_.map_or(true, |w| w.matches(row))
}

fn apply_defaults(model: &ModelDefinition, data: &mut Document) {
    for property in model.properties() {
        if let Some(default) = &property.default {
            if data.get(&property.name).map_or(true, Value::is_null) {
                data.insert(property.name.clone(), default.clone());
            }
        }
    }
}

fn insert(
    model: &ModelDefinition,
    collection: &mut Collection,
    mut data: Document,
) -> Result<Document> {
    if let Some(id_property) = model.id_property() {
        let name = id_property.name.clone();
        match data.get(&name).filter(|v| !v.is_null()).cloned() {
            Some(id) => {
                if collection
                    .rows
                    .iter()
                    .any(|row| row.get(&name).map_or(false, |v| values_equal(v, &id)))
                {
                    return Err(RepositoryError::DuplicateId {
                        entity_name: model.name().to_string(),
                        id: EntityId::from_value(&id)
                            .map_or_else(|| id.to_string(), |id| id.to_string()),
                    });
                }
                if let Some(n) = id.as_i64() {
                    collection.next_id = collection.next_id.max(n.saturating_add(1));
                }
            }
            None if id_property.generated => {
                let generated = match id_property.ty {
                    PropertyType::String => Value::String(uuid::Uuid::new_v4().to_string()),
                    _ => {
                        let next = collection.next_id;
                        // Only reachable once an explicit `i64::MAX` id saturated the sequence.
                        if collection.rows.iter().any(|row| {
                            row.get(&name).and_then(Value::as_i64) == Some(next)
                        }) {
                            return Err(RepositoryError::Validation {
                                entity_name: model.name().to_string(),
                                details: vec![format!("`{}` sequence is exhausted", name)],
                            });
                        }
                        collection.next_id = next.saturating_add(1);
                        Value::from(next)
                    }
                };
                data.insert(name, generated);
            }
            None => {
                return Err(RepositoryError::Validation {
                    entity_name: model.name().to_string(),
                    details: vec![format!("`{}` can't be blank", name)],
                })
            }
        }
    }
    apply_defaults(model, &mut data);
    collection.rows.push(data.clone());
    Ok(data)
}

#[async_trait]
impl Connector for MemoryConnector {
    fn name(&self) -> &str {
        "memory"
    }

    async fn automigrate(&self, models: &[Arc<ModelDefinition>]) -> Result<()> {
        self.mutate(|collections| {
            for model in models {
                collections.insert(model.name().to_string(), Collection::default());
            }
            Ok(())
        })
        .await?;
        tracing::debug!(models = models.len(), "memory connector migrated");
        Ok(())
    }

    async fn create(&self, model: &ModelDefinition, data: Document) -> Result<Document> {
        let row = self.mutate(|collections| {
            let collection = collections.entry(model.name().to_string()).or_default();
            insert(model, collection, data)
        })
        .await?;
        tracing::debug!(model = %model.name(), "memory create");
        Ok(row)
    }

    async fn find(&self, model: &ModelDefinition, filter: &Filter) -> Result<Vec<Document>> {
        Ok(self.read(model, |rows| filter.apply(rows.iter().cloned())))
    }

    async fn count(&self, model: &ModelDefinition, where_: Option<&Where>) -> Result<u64> {
        Ok(self.read(model, |rows| {
            rows.iter().filter(|row| matches(where_, row)).count() as u64
        }))
    }

    async fn update_all(
        &self,
        model: &ModelDefinition,
        data: Document,
        where_: Option<&Where>,
    ) -> Result<u64> {
        let count = self.mutate(|collections| {
            let Some(collection) = collections.get_mut(model.name()) else {
                return Ok(0);
            };
            let mut count = 0;
            for row in collection.rows.iter_mut().filter(|row| matches(where_, row)) {
                for (key, value) in &data {
                    row.insert(key.clone(), value.clone());
                }
                count += 1;
            }
            Ok(count)
        })
        .await?;
        tracing::debug!(model = %model.name(), count, "memory update_all");
        Ok(count)
    }

    async fn replace_by_id(
        &self,
        model: &ModelDefinition,
        id: &EntityId,
        mut data: Document,
    ) -> Result<bool> {
        let Some(id_name) = model.id_name().map(str::to_string) else {
            return Ok(false);
        };
        let expected = id.to_value();
        let found = self.mutate(|collections| {
            let Some(collection) = collections.get_mut(model.name()) else {
                return Ok(false);
            };
            let row = collection
                .rows
                .iter_mut()
                .find(|row| row.get(&id_name).map_or(false, |v| values_equal(v, &expected)));
            match row {
                Some(row) => {
                    let stored_id = row.get(&id_name).cloned().unwrap_or(expected.clone());
                    data.insert(id_name.clone(), stored_id);
                    apply_defaults(model, &mut data);
                    *row = data;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
        .await?;
        tracing::debug!(model = %model.name(), %id, found, "memory replace_by_id");
        Ok(found)
    }

    async fn delete_all(&self, model: &ModelDefinition, where_: Option<&Where>) -> Result<u64> {
        let count = self.mutate(|collections| {
            let Some(collection) = collections.get_mut(model.name()) else {
                return Ok(0);
            };
            let before = collection.rows.len();
            collection.rows.retain(|row| !matches(where_, row));
            Ok((before - collection.rows.len()) as u64)
        })
        .await?;
        tracing::debug!(model = %model.name(), count, "memory delete_all");
        Ok(count)
    }
}
