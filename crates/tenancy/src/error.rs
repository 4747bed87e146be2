//! Error types for tenant isolation and the tenant registry.
//!
//! Errors are grouped by category the same way they surface to callers:
//! configuration problems are raised while wiring models and registries,
//! validation errors come out of document writes, query errors come out of
//! malformed filters, and backend errors are whatever the document driver
//! reported. The isolation layer never wraps or retries driver failures.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all tenancy operations.
#[derive(Error, Debug)]
pub enum TenancyError {
    /// Wiring errors raised while constructing models or the registry
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Document validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Malformed filters or projections
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Errors reported by the document driver
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl TenancyError {
    /// Returns `true` if this is a validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, TenancyError::Validation(_))
    }

    /// Returns `true` if this is a unique-index violation reported by the driver.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, TenancyError::Backend(BackendError::DuplicateKey { .. }))
    }
}

/// Errors raised while configuring models, plugins and the tenant registry.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No database connection was supplied.
    #[error("a database connection is required")]
    MissingConnection,

    /// A caller-supplied tenant model does not declare the identity fields.
    #[error("tenant model '{model_name}' must declare fields: {}", missing_fields.join(", "))]
    InvalidTenantModel {
        model_name: String,
        missing_fields: Vec<String>,
    },

    /// A model with this name is already registered on the connection.
    #[error("model '{model_name}' is already registered")]
    ModelAlreadyRegistered { model_name: String },

    /// No model with this name is registered on the connection.
    #[error("model '{model_name}' is not registered")]
    UnknownModel { model_name: String },

    /// An isolation or backend configuration value is invalid.
    #[error("invalid configuration: {}", problems.join("; "))]
    Invalid { problems: Vec<String> },
}

/// Errors produced when a document fails schema validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is absent or null.
    #[error("{model_name} validation failed: path '{field}' is required")]
    MissingRequiredField { model_name: String, field: String },

    /// A field holds a value of the wrong type.
    #[error("{model_name} validation failed: path '{field}' expected {expected}, found {found}")]
    TypeMismatch {
        model_name: String,
        field: String,
        expected: String,
        found: String,
    },

    /// The value being persisted is not a JSON object.
    #[error("{model_name} validation failed: document must be an object")]
    NotAnObject { model_name: String },
}

impl ValidationError {
    /// Returns the field path the error refers to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::MissingRequiredField { field, .. }
            | ValidationError::TypeMismatch { field, .. } => Some(field),
            ValidationError::NotAnObject { .. } => None,
        }
    }
}

/// Errors related to filter and projection documents.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The filter uses an operator the backend does not understand.
    #[error("unsupported query operator: {operator}")]
    UnsupportedOperator { operator: String },

    /// The filter document is structurally invalid.
    #[error("invalid filter: {message}")]
    InvalidFilter { message: String },

    /// The projection document is structurally invalid.
    #[error("invalid projection: {message}")]
    InvalidProjection { message: String },
}

/// Errors reported by the underlying document store.
#[derive(Error, Debug)]
pub enum BackendError {
    /// A write violated a unique index.
    #[error("duplicate key in {collection}: {field} = {value}")]
    DuplicateKey {
        collection: String,
        field: String,
        value: String,
    },

    /// The backend could not be reached.
    #[error("backend unavailable: {backend_name}: {message}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// A document could not be converted to or from the driver format.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Any other driver failure.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type alias for tenancy operations.
pub type TenancyResult<T> = Result<T, TenancyError>;

impl From<serde_json::Error> for TenancyError {
    fn from(err: serde_json::Error) -> Self {
        TenancyError::Backend(BackendError::Serialization {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for TenancyError {
    fn from(err: mongodb::error::Error) -> Self {
        TenancyError::Backend(BackendError::Internal {
            backend_name: "mongodb".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidTenantModel {
            model_name: "Org".to_string(),
            missing_fields: vec!["id".to_string(), "name".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "tenant model 'Org' must declare fields: id, name"
        );
        assert_eq!(
            ConfigError::MissingConnection.to_string(),
            "a database connection is required"
        );
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::MissingRequiredField {
            model_name: "Order".to_string(),
            field: "tenantId".to_string(),
        };
        assert!(err.to_string().contains("'tenantId' is required"));
        assert_eq!(err.field(), Some("tenantId"));
    }

    #[test]
    fn test_tenancy_error_predicates() {
        let err: TenancyError = ValidationError::NotAnObject {
            model_name: "Order".to_string(),
        }
        .into();
        assert!(err.is_validation());
        assert!(!err.is_duplicate_key());

        let err: TenancyError = BackendError::DuplicateKey {
            collection: "tenants".to_string(),
            field: "id".to_string(),
            value: "\"t1\"".to_string(),
        }
        .into();
        assert!(err.is_duplicate_key());
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: TenancyError = parse.unwrap_err().into();
        assert!(matches!(
            err,
            TenancyError::Backend(BackendError::Serialization { .. })
        ));
    }
}
