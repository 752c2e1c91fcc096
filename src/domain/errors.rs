//! Domain errors for the specforge pipeline.

use thiserror::Error;

/// Domain-level errors that can occur outside of the validators.
#[derive(Debug, Error)]
pub enum DomainError {
    /// JSON or YAML (de)serialization failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Reading or writing a persisted artifact failed
    #[error("I/O error: {0}")]
    IoError(String),

    /// An artifact parsed but is unusable
    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),
}

/// Result alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}
