//! Error types for storage unit configuration management.
//!
//! This module defines all error types using `thiserror`. Variants carry enough
//! context (unit name, node path, suggestion) for an operator to act on them
//! without digging through logs.

use std::fmt;
use thiserror::Error;

/// One storage unit that failed validation, with the reason it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    pub unit: String,
    pub cause: String,
}

impl UnitFailure {
    pub fn new(unit: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            cause: cause.into(),
        }
    }
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.unit, self.cause)
    }
}

/// Aggregated validation failure over a batch of storage units.
///
/// Failures keep the order in which the candidate units were submitted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InvalidStorageUnits {
    failures: Vec<UnitFailure>,
}

impl InvalidStorageUnits {
    pub fn new(failures: Vec<UnitFailure>) -> Self {
        Self { failures }
    }

    pub fn failures(&self) -> &[UnitFailure] {
        &self.failures
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Names of the failing units, in submission order.
    pub fn unit_names(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.unit.as_str())
    }
}

impl fmt::Display for InvalidStorageUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.failures.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[derive(Error, Debug)]
pub enum UnitError {
    #[error("Repository error: {message}")]
    Repository { message: String },

    #[error("Failed to encode storage unit properties: {message}")]
    Encoding { message: String },

    #[error("Failed to decode storage unit properties at {node}: {message}")]
    Decoding { node: String, message: String },

    #[error("Version conflict: version {version} already exists at {node}")]
    VersionConflict { node: String, version: String },

    #[error("Invalid version '{version}' at {node}")]
    InvalidVersion { node: String, version: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Invalid storage units: {0}")]
    InvalidStorageUnits(InvalidStorageUnits),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl UnitError {
    /// Create a repository (coordination store) error.
    pub fn repository(message: impl Into<String>) -> Self {
        Self::Repository {
            message: message.into(),
        }
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    pub fn decoding(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decoding {
            node: node.into(),
            message: message.into(),
        }
    }

    /// Create a version conflict error for a version node that another writer claimed first.
    pub fn version_conflict(node: impl Into<String>, version: impl Into<String>) -> Self {
        Self::VersionConflict {
            node: node.into(),
            version: version.into(),
        }
    }

    pub fn invalid_version(node: impl Into<String>, version: impl Into<String>) -> Self {
        Self::InvalidVersion {
            node: node.into(),
            version: version.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    pub fn invalid_storage_units(failures: Vec<UnitFailure>) -> Self {
        Self::InvalidStorageUnits(InvalidStorageUnits::new(failures))
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::VersionConflict { .. } => {
                Some("Another writer persisted the same version; reload and retry")
            }
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Timeout { .. } | Self::VersionConflict { .. }
        )
    }
}

/// Convert sqlx errors to UnitError.
///
/// Only the SQLite-backed repository and the pool connector talk to sqlx, so
/// configuration and I/O problems surface as connection errors and everything
/// else as a repository error.
impl From<sqlx::Error> for UnitError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => UnitError::connection(
                msg.to_string(),
                "Check the connection URL format and credentials",
            ),
            sqlx::Error::PoolTimedOut => UnitError::connection(
                "Timed out acquiring a pooled connection",
                "Check that the database is reachable or raise the acquire timeout",
            ),
            sqlx::Error::PoolClosed => {
                UnitError::connection("Connection pool is closed", "Reopen the repository")
            }
            sqlx::Error::Io(io_err) => UnitError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => UnitError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Database(db_err) => UnitError::repository(db_err.message().to_string()),
            other => UnitError::repository(other.to_string()),
        }
    }
}

impl From<serde_yaml::Error> for UnitError {
    fn from(err: serde_yaml::Error) -> Self {
        UnitError::encoding(err.to_string())
    }
}

/// Result type alias for storage unit operations.
pub type UnitResult<T> = Result<T, UnitError>;
