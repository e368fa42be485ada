use http::{Method, StatusCode, Uri};
use loopback_repository::RepositoryError;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// A REST call routed to a controller. Transport is out of scope: callers
/// build requests from whatever server or test harness they use.
#[derive(Debug, Clone, PartialEq)]
pub struct RestRequest {
    pub method: Method,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl RestRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: BTreeMap::new(),
            body: None,
        }
    }

    /// Parse `/orders?filter=%7B%22limit%22%3A1%7D` into path and decoded query.
    pub fn parse(method: Method, uri: &str) -> Result<Self, http::uri::InvalidUri> {
        let uri: Uri = uri.parse()?;
        let mut request = Self::new(method, uri.path());
        if let Some(query) = uri.query() {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                request.query.insert(decode(key), decode(value));
            }
        }
        Ok(request)
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Parse a JSON query parameter such as `filter` or `where`.
    pub fn json_query<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, RestResponse> {
        match self.query.get(key) {
            None => Ok(None),
            Some(raw) => serde_json::from_str(raw).map(Some).map_err(|e| {
                RestResponse::error(
                    StatusCode::BAD_REQUEST,
                    "INVALID_PARAMETER_VALUE",
                    format!("Invalid `{}` parameter: {}", key, e),
                )
            }),
        }
    }
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

/// Status and optional JSON body of a handled request.
#[derive(Debug, Clone, PartialEq)]
pub struct RestResponse {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl RestResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: Some(body),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: None,
        }
    }

    /// `{"error": {"statusCode", "name", "code", "message"}}`
    pub fn error(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: Some(json!({
                "error": {
                    "statusCode": status.as_u16(),
                    "name": status.canonical_reason().unwrap_or("Error"),
                    "code": code,
                    "message": message.into(),
                }
            })),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::error(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

impl From<RepositoryError> for RestResponse {
    fn from(err: RepositoryError) -> Self {
        let (status, code) = match &err {
            e if e.is_not_found() => (StatusCode::NOT_FOUND, "ENTITY_NOT_FOUND"),
            RepositoryError::Validation { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_FAILED")
            }
            RepositoryError::UndefinedProperty { .. } | RepositoryError::InvalidData { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_DATA")
            }
            RepositoryError::ForeignKeyMismatch { .. } => {
                (StatusCode::BAD_REQUEST, "FOREIGN_KEY_MISMATCH")
            }
            RepositoryError::DuplicateId { .. } => (StatusCode::CONFLICT, "DUPLICATE_ID"),
            RepositoryError::DuplicateRelatedEntity { .. } => {
                (StatusCode::CONFLICT, "DUPLICATE_RELATED_ENTITY")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        if status.is_server_error() {
            tracing::warn!(error = %err, "request failed");
        }
        Self::error(status, code, err.to_string())
    }
}
