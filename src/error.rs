//! Error types for the cache store
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache store.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Missing or invalid connection settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Entry operation attempted before `start()` or after `stop()`
    #[error("Connection not started (during {operation})")]
    NotStarted { operation: &'static str },

    /// Malformed key descriptor
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Segment name rejected by the validator
    #[error("Invalid segment name: {0}")]
    InvalidSegment(String),

    /// Value could not be encoded or decoded
    #[error("Serialization error during {operation} of {key}: {source}")]
    Serialization {
        operation: &'static str,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Failure surfaced by the storage backend
    #[error("Backend error during {operation} on {target}: {source:#}")]
    Backend {
        operation: &'static str,
        target: String,
        #[source]
        source: anyhow::Error,
    },
}

impl CacheError {
    /// Wraps a backend failure with the operation and key it happened on.
    pub fn backend(operation: &'static str, target: impl Into<String>, source: anyhow::Error) -> Self {
        CacheError::Backend {
            operation,
            target: target.into(),
            source,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache store.
pub type Result<T> = std::result::Result<T, CacheError>;
