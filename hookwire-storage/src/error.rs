//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No row matched a fetch.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The transaction was already committed or rolled back.
    #[error("transaction already closed")]
    Closed,

    /// A create collided with an existing id.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Invalid data.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
