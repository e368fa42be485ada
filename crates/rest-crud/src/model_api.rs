use async_trait::async_trait;
use heck::CamelCase;
use loopback_repository::{DataSource, DefaultCrudRepository, Document};
use loopback_schema::ModelDefinition;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::{
    Application, BootError, CrudRestController, CrudRestControllerOptions, ModelRepository,
    Result,
};

/// Contents of a `public-models/<name>.config.json` file.
///
/// ```json
/// {
///   "model": "Product",
///   "pattern": "CrudRest",
///   "dataSource": "db",
///   "basePath": "/products",
///   "readonly": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelApiConfig {
    pub model: String,
    pub pattern: String,
    pub data_source: String,
    pub base_path: String,
    /// Pattern specific keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelApiConfig {
    pub fn crud_rest(
        model: impl Into<String>,
        data_source: impl Into<String>,
        base_path: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            pattern: CrudRestApiBuilder::PATTERN.to_string(),
            data_source: data_source.into(),
            base_path: base_path.into(),
            extra: Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// A boolean pattern specific key; absent means `false`.
    pub fn flag(&self, key: &str) -> Result<bool> {
        match self.extra.get(key) {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(BootError::InvalidConfig {
                key: key.to_string(),
                reason: format!("expected a boolean, got {}", other),
            }),
        }
    }
}

/// Extension point turning a model config into registered artefacts.
/// Builders are looked up by [`pattern`](Self::pattern).
#[async_trait]
pub trait ModelApiBuilder: Send + Sync {
    fn pattern(&self) -> &str;

    async fn setup(
        &self,
        app: &Application,
        model: Arc<ModelDefinition>,
        config: &ModelApiConfig,
    ) -> Result<()>;
}

/// `order-item` -> `OrderItemRepository`.
pub fn repository_name(model: &str) -> String {
    format!("{}Repository", model.to_camel_case())
}

pub fn controller_name(model: &str) -> String {
    format!("{}Controller", model.to_camel_case())
}

/// A repository for `model` bound to `datasource`. Rejects models without
/// identity.
pub fn define_crud_repository(
    model: Arc<ModelDefinition>,
    datasource: DataSource,
) -> Result<DefaultCrudRepository<Document>> {
    if !model.is_entity() {
        return Err(BootError::InvalidModelKind(model.name().to_string()));
    }
    Ok(DefaultCrudRepository::with_definition(model, datasource))
}

pub fn define_crud_rest_controller(
    model: Arc<ModelDefinition>,
    repository: ModelRepository,
    options: CrudRestControllerOptions,
) -> Result<CrudRestController> {
    if !model.is_entity() {
        return Err(BootError::InvalidModelKind(model.name().to_string()));
    }
    Ok(CrudRestController::new(
        controller_name(model.name()),
        model,
        repository,
        options,
    ))
}

/// Builder for the `CrudRest` pattern: a repository plus a CRUD controller
/// at `basePath`. Supports the `readonly` key.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrudRestApiBuilder;

impl CrudRestApiBuilder {
    pub const PATTERN: &'static str = "CrudRest";
}

#[async_trait]
impl ModelApiBuilder for CrudRestApiBuilder {
    fn pattern(&self) -> &str {
        Self::PATTERN
    }

    async fn setup(
        &self,
        app: &Application,
        model: Arc<ModelDefinition>,
        config: &ModelApiConfig,
    ) -> Result<()> {
        if !model.is_entity() {
            return Err(BootError::InvalidModelKind(model.name().to_string()));
        }
        let datasource = app.datasource(&config.data_source)?;
        let readonly = config.flag("readonly")?;

        let repository_key = repository_name(model.name());
        let repository = match app.repository(&repository_key) {
            Some(existing) => {
                tracing::debug!(repository = %repository_key, "reusing bound repository");
                existing
            }
            None => {
                let repository: ModelRepository =
                    Arc::new(define_crud_repository(model.clone(), datasource)?);
                app.bind_repository(repository_key, repository.clone());
                repository
            }
        };

        let options = CrudRestControllerOptions::new(&config.base_path).readonly(readonly);
        let controller = define_crud_rest_controller(model, repository, options)?;
        app.bind_controller(controller);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_names_follow_model_name() {
        assert_eq!(repository_name("Product"), "ProductRepository");
        assert_eq!(controller_name("order-item"), "OrderItemController");
    }

    #[test]
    fn config_keeps_pattern_keys() {
        let config: ModelApiConfig = serde_json::from_value(json!({
            "model": "Product",
            "pattern": "CrudRest",
            "dataSource": "db",
            "basePath": "/products",
            "readonly": true
        }))
        .unwrap();
        assert_eq!(config.data_source, "db");
        assert!(config.flag("readonly").unwrap());
        assert!(!config.flag("missing").unwrap());

        let bad = config.with("readonly", "yes");
        assert!(matches!(bad.flag("readonly"), Err(BootError::InvalidConfig { .. })));
    }
}
