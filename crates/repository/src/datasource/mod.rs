//! Datasources and the connector seam.

use async_trait::async_trait;
use loopback_schema::{EntityId, ModelDefinition};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::{Document, Filter, RepositoryError, Result, Where};

mod memory;

pub use memory::MemoryConnector;

/// Storage backend behind a datasource.
///
/// Rows travel as JSON [`Document`]s keyed by property name. Failures that
/// are not one of the typed [`RepositoryError`]s should be returned as
/// `RepositoryError::Connector` and are passed to callers unchanged.
#[async_trait]
pub trait Connector: Send + Sync {
    fn name(&self) -> &str;

    /// Create or reset storage for `models`. Existing rows are dropped.
    async fn automigrate(&self, models: &[Arc<ModelDefinition>]) -> Result<()>;

    /// Insert a row, generating the id when the model declares a generated id
    /// and `data` has none. Returns the stored row.
    async fn create(&self, model: &ModelDefinition, data: Document) -> Result<Document>;

    async fn find(&self, model: &ModelDefinition, filter: &Filter) -> Result<Vec<Document>>;

    async fn count(&self, model: &ModelDefinition, where_: Option<&Where>) -> Result<u64>;

    /// Merge `data` into every matching row.
    async fn update_all(
        &self,
        model: &ModelDefinition,
        data: Document,
        where_: Option<&Where>,
    ) -> Result<u64>;

    /// Replace the row with `id`. Returns false when no such row exists.
    async fn replace_by_id(
        &self,
        model: &ModelDefinition,
        id: &EntityId,
        data: Document,
    ) -> Result<bool>;

    async fn delete_all(&self, model: &ModelDefinition, where_: Option<&Where>) -> Result<u64>;
}

fn default_connector() -> String {
    "memory".to_string()
}

/// Contents of a `datasources/<name>.datasource.json` file.
///
/// ```json
/// {"name": "db", "connector": "memory", "file": "./data/db.json"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceConfig {
    pub name: String,
    #[serde(default = "default_connector")]
    pub connector: String,
    /// Connector specific settings.
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl DataSourceConfig {
    pub fn memory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connector: default_connector(),
            settings: Map::new(),
        }
    }
}

/// A named connector instance that repositories are bound to.
#[derive(Clone)]
pub struct DataSource {
    name: String,
    connector: Arc<dyn Connector>,
}

impl DataSource {
    pub fn new(name: impl Into<String>, connector: Arc<dyn Connector>) -> Self {
        Self {
            name: name.into(),
            connector,
        }
    }

    /// A datasource backed by a fresh, non-persistent memory connector.
    pub fn memory(name: impl Into<String>) -> Self {
        Self::new(name, Arc::new(MemoryConnector::new()))
    }

    /// Build the connector named by `config`.
    pub async fn from_config(config: &DataSourceConfig) -> Result<Self> {
        let connector: Arc<dyn Connector> = match config.connector.as_str() {
            "memory" => match config.settings.get("file").and_then(Value::as_str) {
                Some(file) => Arc::new(MemoryConnector::with_file(PathBuf::from(file)).await?),
                None => Arc::new(MemoryConnector::new()),
            },
            other => return Err(RepositoryError::UnknownConnector(other.to_string())),
        };
        tracing::debug!(
            datasource = %config.name,
            connector = %config.connector,
            "datasource created"
        );
        Ok(Self::new(config.name.clone(), connector))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connector(&self) -> &Arc<dyn Connector> {
        &self.connector
    }

    pub async fn automigrate(&self, models: &[Arc<ModelDefinition>]) -> Result<()> {
        self.connector.automigrate(models).await
    }
}

impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSource")
            .field("name", &self.name)
            .field("connector", &self.connector.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_keeps_connector_settings() {
        let config: DataSourceConfig = serde_json::from_value(json!({
            "name": "db",
            "connector": "memory",
            "file": "./db.json"
        }))
        .unwrap();
        assert_eq!(config.connector, "memory");
        assert_eq!(config.settings["file"], json!("./db.json"));

        let config: DataSourceConfig = serde_json::from_value(json!({"name": "db"})).unwrap();
        assert_eq!(config, DataSourceConfig::memory("db"));
    }

    #[tokio::test]
    async fn unknown_connector_is_rejected() {
        let config: DataSourceConfig =
            serde_json::from_value(json!({"name": "db", "connector": "mysql"})).unwrap();
        let err = DataSource::from_config(&config).await.unwrap_err();
        assert!(matches!(err, RepositoryError::UnknownConnector(ref c) if c == "mysql"));
    }
}
