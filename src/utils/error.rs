//! Error types for the access-control engine

use thiserror::Error;

/// Result type alias for the engine
pub type Result<T> = std::result::Result<T, AuthzError>;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum AuthzError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A principal, role, or permission id does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or unknown ids in a request, with the offending ids
    #[error("Validation failed: {reason} (offending ids: {ids:?})")]
    Validation {
        /// What was wrong with the input
        reason: String,
        /// The ids that failed validation
        ids: Vec<String>,
    },

    /// A record with the same identity already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The cache collaborator is unreachable (degraded mode on read paths)
    #[error("Cache unavailable: {0}")]
    Cache(String),

    /// The backing store is unreachable (fatal for the current operation)
    #[error("Store unavailable: {0}")]
    Store(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Redis errors
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl AuthzError {
    /// Create a not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        AuthzError::NotFound(message.into())
    }

    /// Create a validation error carrying the offending ids
    pub fn validation(reason: impl Into<String>, ids: Vec<String>) -> Self {
        AuthzError::Validation {
            reason: reason.into(),
            ids,
        }
    }
}
