use http::Method;
use loopback_repository::{Document, EntityCrudRepository, Filter, Where};
use loopback_schema::{EntityId, ModelDefinition, PropertyType};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::{RestRequest, RestResponse};

/// Repository type every synthesized controller talks to.
pub type ModelRepository = Arc<dyn EntityCrudRepository<Document>>;

/// Operation served by a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrudOperation {
    Create,
    Find,
    Count,
    FindById,
    UpdateAll,
    UpdateById,
    ReplaceById,
    DeleteById,
}

impl CrudOperation {
    pub const ALL: [CrudOperation; 8] = [
        CrudOperation::Create,
        CrudOperation::Find,
        CrudOperation::Count,
        CrudOperation::FindById,
        CrudOperation::UpdateAll,
        CrudOperation::UpdateById,
        CrudOperation::ReplaceById,
        CrudOperation::DeleteById,
    ];

    pub fn method(&self) -> Method {
        match self {
            CrudOperation::Create => Method::POST,
            CrudOperation::Find | CrudOperation::Count | CrudOperation::FindById => Method::GET,
            CrudOperation::UpdateAll | CrudOperation::UpdateById => Method::PATCH,
            CrudOperation::ReplaceById => Method::PUT,
            CrudOperation::DeleteById => Method::DELETE,
        }
    }

    /// Path relative to the controller's base path.
    pub fn path(&self) -> &'static str {
        match self {
            CrudOperation::Create | CrudOperation::Find | CrudOperation::UpdateAll => "/",
            CrudOperation::Count => "/count",
            _ => "/{id}",
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.method() == Method::GET
    }

    pub fn name(&self) -> &'static str {
        match self {
            CrudOperation::Create => "create",
            CrudOperation::Find => "find",
            CrudOperation::Count => "count",
            CrudOperation::FindById => "findById",
            CrudOperation::UpdateAll => "updateAll",
            CrudOperation::UpdateById => "updateById",
            CrudOperation::ReplaceById => "replaceById",
            CrudOperation::DeleteById => "deleteById",
        }
    }
}

/// An exposed route, with the full path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: Method,
    pub path: String,
    pub operation: CrudOperation,
    pub controller: String,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<7} {:<24} {}.{}",
            self.method.as_str(),
            self.path,
            self.controller,
            self.operation.name()
        )
    }
}

/// Options of a CRUD REST controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrudRestControllerOptions {
    pub base_path: String,
    /// Expose only the GET routes.
    pub readonly: bool,
}

impl CrudRestControllerOptions {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: normalize_base_path(&base_path.into()),
            readonly: false,
        }
    }

    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }
}

/// `orders/` -> `/orders`, `` -> `/`.
pub fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    format!("/{}", trimmed)
}

/// REST controller exposing CRUD operations of one model at a base path.
pub struct CrudRestController {
    name: String,
    model: Arc<ModelDefinition>,
    repository: ModelRepository,
    options: CrudRestControllerOptions,
}

impl fmt::Debug for CrudRestController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrudRestController")
            .field("name", &self.name)
            .field("model", &self.model.name())
            .field("options", &self.options)
            .finish()
    }
}

impl CrudRestController {
    pub fn new(
        name: impl Into<String>,
        model: Arc<ModelDefinition>,
        repository: ModelRepository,
        options: CrudRestControllerOptions,
    ) -> Self {
        Self {
            name: name.into(),
            model,
            repository,
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &Arc<ModelDefinition> {
        &self.model
    }

    pub fn base_path(&self) -> &str {
        &self.options.base_path
    }

    pub fn is_readonly(&self) -> bool {
        self.options.readonly
    }

    pub fn operations(&self) -> Vec<CrudOperation> {
        CrudOperation::ALL
            .into_iter()
            .filter(|op| !self.options.readonly || op.is_read_only())
            .collect()
    }

    pub fn routes(&self) -> Vec<Route> {
        self.operations()
            .into_iter()
            .map(|operation| Route {
                method: operation.method(),
                path: self.full_path(operation.path()),
                operation,
                controller: self.name.clone(),
            })
            .collect()
    }

    fn full_path(&self, relative: &str) -> String {
        match (self.options.base_path.as_str(), relative) {
            ("/", relative) => relative.to_string(),
            (base, "/") => base.to_string(),
            (base, relative) => format!("{}{}", base, relative),
        }
    }

    /// Strip the base path. `None` when `path` is outside this controller.
    pub fn relative_path<'a>(&self, path: &'a str) -> Option<&'a str> {
        let path = path.trim_end_matches('/');
        let base = self.options.base_path.trim_end_matches('/');
        let rest = path.strip_prefix(base)?;
        if rest.is_empty() {
            Some("/")
        } else if rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    fn parse_id(&self, raw: &str) -> EntityId {
        let ty = self
            .model
            .id_property()
            .map(|p| p.ty)
            .unwrap_or(PropertyType::Any);
        ty.parse_id(raw)
    }

    fn route(&self, method: &Method, relative: &str) -> Option<(CrudOperation, Option<EntityId>)> {
        let segment = relative.trim_start_matches('/');
        let operation = match (method, segment) {
            (&Method::POST, "") => CrudOperation::Create,
            (&Method::GET, "") => CrudOperation::Find,
            (&Method::PATCH, "") => CrudOperation::UpdateAll,
            (&Method::GET, "count") => CrudOperation::Count,
            (_, s) if s.is_empty() || s.contains('/') => return None,
            (&Method::GET, _) => CrudOperation::FindById,
            (&Method::PATCH, _) => CrudOperation::UpdateById,
            (&Method::PUT, _) => CrudOperation::ReplaceById,
            (&Method::DELETE, _) => CrudOperation::DeleteById,
            _ => return None,
        };
        if self.options.readonly && !operation.is_read_only() {
            return None;
        }
        let id = (operation.path() == "/{id}").then(|| {
            let raw = urlencoding::decode(segment)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| segment.to_string());
            self.parse_id(&raw)
        });
        Some((operation, id))
    }

    /// Dispatch a request whose path is relative to the base path.
    pub async fn handle(&self, request: RestRequest) -> RestResponse {
        let Some((operation, id)) = self.route(&request.method, &request.path) else {
            return RestResponse::not_found(format!(
                "Endpoint \"{} {}\" not found.",
                request.method,
                self.full_path(&request.path)
            ));
        };
        tracing::debug!(
            controller = %self.name,
            operation = operation.name(),
            "handling request"
        );
        match self.invoke(operation, id, request).await {
            Ok(response) => response,
            Err(response) => response,
        }
    }

    async fn invoke(
        &self,
        operation: CrudOperation,
        id: Option<EntityId>,
        request: RestRequest,
    ) -> Result<RestResponse, RestResponse> {
        let body = request.body.clone().unwrap_or(Value::Null);
        let required_id = || id.clone().ok_or_else(|| RestResponse::not_found("missing id"));
        let response = match operation {
            CrudOperation::Create => {
                let created = self.repository.create(body).await?;
                RestResponse::ok(Value::Object(created))
            }
            CrudOperation::Find => {
                let filter: Option<Filter> = request.json_query("filter")?;
                let found = self.repository.find(filter).await?;
                RestResponse::ok(Value::Array(found.into_iter().map(Value::Object).collect()))
            }
            CrudOperation::Count => {
                let where_: Option<Where> = request.json_query("where")?;
                let count = self.repository.count(where_).await?;
                RestResponse::ok(serde_json::json!(count))
            }
            CrudOperation::FindById => {
                let filter: Option<Filter> = request.json_query("filter")?;
                let found = self.repository.find_by_id(&required_id()?, filter).await?;
                RestResponse::ok(Value::Object(found))
            }
            CrudOperation::UpdateAll => {
                let where_: Option<Where> = request.json_query("where")?;
                let count = self.repository.update_all(body, where_).await?;
                RestResponse::ok(serde_json::json!(count))
            }
            CrudOperation::UpdateById => {
                self.repository.update_by_id(&required_id()?, body).await?;
                RestResponse::no_content()
            }
            CrudOperation::ReplaceById => {
                self.repository.replace_by_id(&required_id()?, body).await?;
                RestResponse::no_content()
            }
            CrudOperation::DeleteById => {
                self.repository.delete_by_id(&required_id()?).await?;
                RestResponse::no_content()
            }
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopback_repository::{DataSource, DefaultCrudRepository};
    use loopback_schema::PropertyDefinition;

    fn controller(base_path: &str, readonly: bool) -> CrudRestController {
        let model = ModelDefinition::new("Product")
            .add_property(PropertyDefinition::id("id", PropertyType::Number))
            .build();
        let repository = DefaultCrudRepository::<Document>::with_definition(
            model.clone(),
            DataSource::memory("db"),
        );
        CrudRestController::new(
            "ProductController",
            model,
            Arc::new(repository),
            CrudRestControllerOptions::new(base_path).readonly(readonly),
        )
    }

    #[test]
    fn lists_routes_under_base_path() {
        let routes: Vec<String> = controller("products/", false)
            .routes()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect();
        assert_eq!(
            routes,
            vec![
                "POST /products",
                "GET /products",
                "GET /products/count",
                "GET /products/{id}",
                "PATCH /products",
                "PATCH /products/{id}",
                "PUT /products/{id}",
                "DELETE /products/{id}",
            ]
        );
    }

    #[test]
    fn readonly_exposes_only_get() {
        let ops = controller("/products", true).operations();
        assert_eq!(
            ops,
            vec![CrudOperation::Find, CrudOperation::Count, CrudOperation::FindById]
        );
    }

    #[test]
    fn relative_paths() {
        let c = controller("/products", false);
        assert_eq!(c.relative_path("/products"), Some("/"));
        assert_eq!(c.relative_path("/products/"), Some("/"));
        assert_eq!(c.relative_path("/products/7"), Some("/7"));
        assert_eq!(c.relative_path("/productsx"), None);
        assert_eq!(c.relative_path("/orders"), None);
    }

    #[test]
    fn routes_by_method_and_segment() {
        let c = controller("/products", false);
        assert_eq!(
            c.route(&Method::GET, "/12"),
            Some((CrudOperation::FindById, Some(EntityId::Number(12))))
        );
        assert_eq!(c.route(&Method::GET, "/count").map(|r| r.0), Some(CrudOperation::Count));
        assert_eq!(c.route(&Method::DELETE, "/"), None);
        assert_eq!(c.route(&Method::GET, "/1/orders"), None);
    }
}
