//! Error types for Deepnote core operations.
//!
//! This module defines the error hierarchy for all core operations.
//! Errors are descriptive at the core level; the CLI layer maps these
//! to user-friendly messages and exit codes.

use thiserror::Error;

/// Result type alias for Deepnote core operations.
pub type Result<T> = std::result::Result<T, DeepnoteError>;

/// Core error type for Deepnote operations.
#[derive(Debug, Error)]
pub enum DeepnoteError {
    /// Incorrect passphrase during decryption
    #[error("Incorrect passphrase")]
    IncorrectPassphrase,

    /// Encryption or decryption error
    #[error("Encryption error: {0}")]
    Crypto(String),

    /// Credential store backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Persisted record does not match the schema for its type
    #[error("Schema error: {0}")]
    Schema(String),

    /// Integration type or auth method cannot be turned into a connection
    #[error("Unsupported integration {integration_type}: {reason}")]
    UnsupportedIntegration {
        integration_type: String,
        reason: String,
    },

    /// Attempt to mutate the built-in dataframe integration
    #[error("Integration {0} is reserved and cannot be modified")]
    ReservedIntegration(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// YAML project file error
    #[error("YAML error: {source}")]
    Yaml {
        #[from]
        source: serde_yaml::Error,
    },

    /// Generic error (fallback)
    #[error("{0}")]
    Other(String),
}

impl DeepnoteError {
    pub(crate) fn unsupported(
        integration_type: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        DeepnoteError::UnsupportedIntegration {
            integration_type: integration_type.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_message_names_type_and_reason() {
        let err = DeepnoteError::unsupported("snowflake", "auth method okta is not supported");
        let message = err.to_string();
        assert!(message.contains("snowflake"));
        assert!(message.contains("okta"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: DeepnoteError = io.into();
        assert!(matches!(err, DeepnoteError::Io { .. }));
    }
}
