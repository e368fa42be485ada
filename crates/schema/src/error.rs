use thiserror::Error;

/// Errors raised while building or resolving model descriptors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Model `{0}` is not defined")]
    UnknownModel(String),

    #[error("Relation `{relation}` of model `{model}` has the same name as a property")]
    RelationShadowsProperty { model: String, relation: String },

    #[error("Model registry is no longer available to resolve `{0}`")]
    RegistryDropped(String),
}
