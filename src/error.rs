//! Custom error types for cbr
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions. No error is retried or swallowed: every
//! failure aborts the current run and carries enough context (operation and
//! entity identifier) to diagnose without re-running.

use thiserror::Error;

/// The main error type for backup/restore operations
#[derive(Error, Debug)]
pub enum CbrError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Artifact store errors (local file or S3)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Malformed or undeserializable snapshot data
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// A Cognito service call failed
    #[error("{operation} failed for {entity}: {message}")]
    Service {
        operation: &'static str,
        entity: String,
        message: String,
    },

    /// A non-SSO user cannot be provisioned without a default password
    #[error("default password is required for non-SSO user: {0}")]
    MissingDefaultPassword(String),
}

impl CbrError {
    /// Create a service error for a failed Cognito call
    pub fn service(
        operation: &'static str,
        entity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Service {
            operation,
            entity: entity.into(),
            message: message.into(),
        }
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for CbrError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for CbrError {
    fn from(err: serde_json::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}

/// Result type alias for backup/restore operations
pub type CbrResult<T> = Result<T, CbrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CbrError::Config("missing region".into());
        assert_eq!(err.to_string(), "Configuration error: missing region");
    }

    #[test]
    fn test_service_error_display() {
        let err = CbrError::service("CreateGroup", "admins", "throttled");
        assert_eq!(err.to_string(), "CreateGroup failed for admins: throttled");
    }

    #[test]
    fn test_missing_password_display() {
        let err = CbrError::MissingDefaultPassword("jdoe".into());
        assert_eq!(
            err.to_string(),
            "default password is required for non-SSO user: jdoe"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CbrError = io_err.into();
        assert!(matches!(err, CbrError::Storage(_)));
    }
}
