//! Error types for reparto operations.
//!
//! Validation failures are reported to the caller before any write; backend
//! failures surface as `Store` errors and are never retried here.

use thiserror::Error;

/// Result type alias for reparto operations.
pub type RepartoResult<T> = Result<T, RepartoError>;

/// Main error type for all reparto operations.
#[derive(Error, Debug)]
pub enum RepartoError {
    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Factura not found.
    #[error("Factura not found: {message}")]
    NotFound {
        message: String,
        factura_id: Option<i64>,
    },

    /// Storage backend failure.
    #[error("Store error: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RepartoError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a validation error attributed to a specific input field.
    pub fn validation_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a not found error for a factura id.
    pub fn not_found(factura_id: i64) -> Self {
        Self::NotFound {
            message: format!("Factura with id {} not found", factura_id),
            factura_id: Some(factura_id),
        }
    }

    /// Create a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            source: None,
        }
    }

    /// The input field a validation error is attributed to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => field.as_deref(),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for RepartoError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Store {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = RepartoError::validation_field("cliente", "cliente is required");
        assert_eq!(err.field(), Some("cliente"));
        assert!(err.to_string().contains("cliente is required"));
    }

    #[test]
    fn test_not_found_error() {
        let err = RepartoError::not_found(42);
        assert!(err.to_string().contains("42"));
        assert!(err.field().is_none());
    }
}
