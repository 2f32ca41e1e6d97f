//! Error types for source-of-truth operations

use thiserror::Error;

use crate::backend::BackendError;
use crate::central::ResolutionError;
use crate::domain::ValidationError;

/// Errors surfaced by read paths, configuration and the session
///
/// Mutating entity operations do not return these; they report through the
/// OperationLog and return `None` instead.
#[derive(Debug, Error)]
pub enum SotError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend call failed
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Reference could not be resolved
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// Desired state rejected before any backend call
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Named query missing from the configuration
    #[error("Unknown query: {0}")]
    UnknownQuery(String),

    /// Query response did not have the expected shape
    #[error("Unexpected query response: {0}")]
    UnexpectedResponse(String),
}

/// Result type for source-of-truth operations
pub type SotResult<T> = Result<T, SotError>;
