use loopback_repository::RepositoryError;
use loopback_schema::SchemaError;
use thiserror::Error;

/// Errors raised while booting project artefacts or synthesizing model APIs.
///
/// Each error is fatal only to the artefact being booted.
#[derive(Debug, Error)]
pub enum BootError {
    #[error("Unsupported API pattern `{pattern}` for model `{model}`")]
    UnsupportedPattern { pattern: String, model: String },

    #[error("Model `{0}` is not an Entity: CrudRest requires a model with an id property")]
    InvalidModelKind(String),

    #[error("Model `{0}` is not bound (expected binding `models.{0}`)")]
    UnknownModel(String),

    #[error("DataSource `{0}` is not bound (expected binding `datasources.{0}`)")]
    UnknownDataSource(String),

    #[error("Invalid config `{key}`: {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<glob::GlobError> for BootError {
    fn from(err: glob::GlobError) -> Self {
        BootError::Io(err.into_error())
    }
}

pub type Result<T, E = BootError> = std::result::Result<T, E>;
