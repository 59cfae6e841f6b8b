//! Queue store error types.

use thiserror::Error;

/// Errors raised by a [`crate::DataQueue`].
#[derive(Error, Debug)]
pub enum QueueError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// The store was closed; no further reads or writes are accepted.
    #[error("Queue is closed")]
    Closed,

    /// A stored row could not be turned back into an entity.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using QueueError.
pub type QueueResult<T> = Result<T, QueueError>;
