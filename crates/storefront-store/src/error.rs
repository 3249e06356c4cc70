//! Error types for storefront storage.

use std::time::Duration;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// A uniqueness constraint rejected the write.
    #[error("{entity} already exists: {id}")]
    AlreadyExists {
        /// Kind of record.
        entity: &'static str,
        /// Identifier of the conflicting record.
        id: String,
    },

    /// A check constraint rejected the write.
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// A stored value could not be decoded.
    #[error("invalid stored data: {0}")]
    InvalidData(String),

    /// A storage operation did not finish in time.
    #[error("storage operation timed out after {0:?}")]
    TimedOut(Duration),
}

impl StoreError {
    /// Check if this error is a uniqueness violation for `entity`.
    #[must_use]
    pub fn is_already_exists(&self, entity: &str) -> bool {
        matches!(self, Self::AlreadyExists { entity: e, .. } if *e == entity)
    }
}
