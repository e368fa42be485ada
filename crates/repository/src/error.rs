use loopback_schema::SchemaError;
use std::fmt::Display;
use thiserror::Error;

/// Errors surfaced by repositories, datasources and relation accessors.
///
/// Connector failures are carried through [`RepositoryError::Connector`]
/// without being retried or rewritten.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {entity_name} with id {id}")]
    EntityNotFound { entity_name: String, id: String },

    /// A belongsTo/hasOne accessor found no target for the bound key.
    #[error("Related entity not found: {entity_name} with {key} {id}")]
    RelatedEntityNotFound {
        entity_name: String,
        key: String,
        id: String,
    },

    #[error("Property \"{property}\" cannot be changed!")]
    ForeignKeyMismatch { property: String },

    #[error("Duplicate entry for {entity_name}.{property}")]
    DuplicateRelatedEntity {
        entity_name: String,
        property: String,
    },

    #[error("Invalid relation `{relation}` of model `{source_model}`: {reason}")]
    InvalidRelation {
        relation: String,
        source_model: String,
        reason: String,
    },

    #[error("`{property}` is not defined in model `{entity_name}`")]
    UndefinedProperty {
        entity_name: String,
        property: String,
    },

    #[error("The `{entity_name}` instance is not valid. Details: {}", details.join("; "))]
    Validation {
        entity_name: String,
        details: Vec<String>,
    },

    #[error("Duplicate entry for {entity_name} with id {id}")]
    DuplicateId { entity_name: String, id: String },

    #[error("Invalid data for {entity_name}: {reason}")]
    InvalidData { entity_name: String, reason: String },

    #[error("Repository `{0}` has not been bound yet")]
    UnresolvedRepository(String),

    #[error("Repository `{0}` has already been bound")]
    RepositoryAlreadyBound(String),

    #[error("Unknown connector `{0}`")]
    UnknownConnector(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Connector(#[from] anyhow::Error),
}

impl RepositoryError {
    pub fn entity_not_found(entity_name: &str, id: impl Display) -> Self {
        RepositoryError::EntityNotFound {
            entity_name: entity_name.to_string(),
            id: id.to_string(),
        }
    }

    pub fn invalid_data(entity_name: &str, reason: impl Into<String>) -> Self {
        RepositoryError::InvalidData {
            entity_name: entity_name.to_string(),
            reason: reason.into(),
        }
    }

    /// True for both direct lookups and relation lookups that found nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RepositoryError::EntityNotFound { .. } | RepositoryError::RelatedEntityNotFound { .. }
        )
    }
}

pub type Result<T, E = RepositoryError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_property() {
        let err = RepositoryError::ForeignKeyMismatch {
            property: "customerId".into(),
        };
        assert_eq!(err.to_string(), "Property \"customerId\" cannot be changed!");

        let err = RepositoryError::UndefinedProperty {
            entity_name: "Customer".into(),
            property: "orders".into(),
        };
        assert_eq!(err.to_string(), "`orders` is not defined in model `Customer`");
    }

    #[test]
    fn not_found_covers_relations() {
        assert!(RepositoryError::entity_not_found("Order", 1).is_not_found());
        assert!(RepositoryError::RelatedEntityNotFound {
            entity_name: "Customer".into(),
            key: "id".into(),
            id: "999".into(),
        }
        .is_not_found());
        assert!(!RepositoryError::ForeignKeyMismatch {
            property: "customerId".into()
        }
        .is_not_found());
    }
}
