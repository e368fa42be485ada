use loopback_repository::DataSource;
use loopback_schema::{ModelDefinition, SchemaError, TypeResolver};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::{
    BootError, CrudRestApiBuilder, CrudRestController, ModelApiBuilder, ModelApiConfig,
    ModelRepository, RestRequest, RestResponse, Result, Route,
};

type Models = RwLock<BTreeMap<String, Arc<ModelDefinition>>>;

/// Component registry of an application.
///
/// Artefacts are bound under namespaced keys: `models.<Name>`,
/// `datasources.<name>`, `repositories.<Name>Repository` and
/// `controllers.<Name>Controller`. Re-binding a key replaces the old value.
pub struct Application {
    models: Arc<Models>,
    datasources: RwLock<BTreeMap<String, DataSource>>,
    repositories: RwLock<BTreeMap<String, ModelRepository>>,
    controllers: RwLock<BTreeMap<String, Arc<CrudRestController>>>,
    builders: RwLock<BTreeMap<String, Arc<dyn ModelApiBuilder>>>,
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("bindings", &self.binding_keys())
            .finish()
    }
}

impl Application {
    /// An application with the built-in `CrudRest` model API builder.
    pub fn new() -> Self {
        let app = Self::empty();
        app.add_model_api_builder(Arc::new(CrudRestApiBuilder));
        app
    }

    /// An application without any model API builder.
    pub fn empty() -> Self {
        Self {
            models: Arc::new(RwLock::new(BTreeMap::new())),
            datasources: RwLock::new(BTreeMap::new()),
            repositories: RwLock::new(BTreeMap::new()),
            controllers: RwLock::new(BTreeMap::new()),
            builders: RwLock::new(BTreeMap::new()),
        }
    }

    // ------------------------------------------------------------------
    // models
    // ------------------------------------------------------------------

    pub fn bind_model(&self, model: Arc<ModelDefinition>) {
        tracing::debug!(key = %format!("models.{}", model.name()), "binding model");
        self.models.write().insert(model.name().to_string(), model);
    }

    pub fn model(&self, name: &str) -> Result<Arc<ModelDefinition>> {
        self.models
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BootError::UnknownModel(name.to_string()))
    }

    /// Resolves `name` from the model bindings whenever it is invoked, so
    /// model files may reference models booted after them.
    pub fn model_resolver(&self, name: &str) -> TypeResolver {
        let models: Weak<Models> = Arc::downgrade(&self.models);
        let name = name.to_string();
        TypeResolver::new(move || {
            let models = models
                .upgrade()
                .ok_or_else(|| SchemaError::RegistryDropped(name.clone()))?;
            let found = models.read().get(&name).cloned();
            found.ok_or_else(|| SchemaError::UnknownModel(name.clone()))
        })
    }

    // ------------------------------------------------------------------
    // datasources
    // ------------------------------------------------------------------

    pub fn bind_datasource(&self, datasource: DataSource) {
        tracing::debug!(key = %format!("datasources.{}", datasource.name()), "binding datasource");
        self.datasources
            .write()
            .insert(datasource.name().to_string(), datasource);
    }

    pub fn datasource(&self, name: &str) -> Result<DataSource> {
        self.datasources
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BootError::UnknownDataSource(name.to_string()))
    }

    // ------------------------------------------------------------------
    // repositories & controllers
    // ------------------------------------------------------------------

    pub fn bind_repository(&self, name: impl Into<String>, repository: ModelRepository) {
        let name = name.into();
        tracing::debug!(key = %format!("repositories.{}", name), "binding repository");
        self.repositories.write().insert(name, repository);
    }

    pub fn repository(&self, name: &str) -> Option<ModelRepository> {
        self.repositories.read().get(name).cloned()
    }

    pub fn bind_controller(&self, controller: CrudRestController) -> Arc<CrudRestController> {
        let controller = Arc::new(controller);
        tracing::debug!(
            key = %format!("controllers.{}", controller.name()),
            base_path = %controller.base_path(),
            "binding controller"
        );
        self.controllers
            .write()
            .insert(controller.name().to_string(), controller.clone());
        controller
    }

    pub fn controller(&self, name: &str) -> Option<Arc<CrudRestController>> {
        self.controllers.read().get(name).cloned()
    }

    pub fn controllers(&self) -> Vec<Arc<CrudRestController>> {
        self.controllers.read().values().cloned().collect()
    }

    /// All binding keys, sorted by namespace then name.
    pub fn binding_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        keys.extend(self.controllers.read().keys().map(|k| format!("controllers.{}", k)));
        keys.extend(self.datasources.read().keys().map(|k| format!("datasources.{}", k)));
        keys.extend(self.models.read().keys().map(|k| format!("models.{}", k)));
        keys.extend(self.repositories.read().keys().map(|k| format!("repositories.{}", k)));
        keys
    }

    // ------------------------------------------------------------------
    // model API builders
    // ------------------------------------------------------------------

    pub fn add_model_api_builder(&self, builder: Arc<dyn ModelApiBuilder>) {
        tracing::debug!(pattern = %builder.pattern(), "registering model API builder");
        self.builders
            .write()
            .insert(builder.pattern().to_string(), builder);
    }

    pub fn model_api_builder(&self, pattern: &str) -> Option<Arc<dyn ModelApiBuilder>> {
        self.builders.read().get(pattern).cloned()
    }

    /// Dispatch `config` to the builder registered for its pattern.
    pub async fn setup_model_api(&self, config: &ModelApiConfig) -> Result<()> {
        let builder = self.model_api_builder(&config.pattern).ok_or_else(|| {
            BootError::UnsupportedPattern {
                pattern: config.pattern.clone(),
                model: config.model.clone(),
            }
        })?;
        let model = self.model(&config.model)?;
        builder.setup(self, model, config).await
    }

    // ------------------------------------------------------------------
    // routing
    // ------------------------------------------------------------------

    pub fn routes(&self) -> Vec<Route> {
        self.controllers()
            .iter()
            .flat_map(|controller| controller.routes())
            .collect()
    }

    /// Route `request` to the controller with the longest matching base path.
    pub async fn handle(&self, mut request: RestRequest) -> RestResponse {
        let target = self
            .controllers()
            .into_iter()
            .filter_map(|controller| {
                let relative = controller.relative_path(&request.path)?.to_string();
                Some((controller, relative))
            })
            .max_by_key(|(controller, _)| controller.base_path().len());

        match target {
            Some((controller, relative)) => {
                request.path = relative;
                controller.handle(request).await
            }
            None => RestResponse::not_found(format!(
                "Endpoint \"{} {}\" not found.",
                request.method, request.path
            )),
        }
    }
}
