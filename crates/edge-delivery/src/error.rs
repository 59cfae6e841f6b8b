//! Delivery error types.

use thiserror::Error;

/// Errors surfaced by the [`crate::Edge`] façade.
///
/// Delivery failures are not errors: they end as dropped hits or error
/// events. These cover construction and local storage.
#[derive(Error, Debug)]
pub enum EdgeError {
    /// Hit store error
    #[error("Queue error: {0}")]
    Queue(#[from] edge_data_queue::QueueError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration or path error
    #[error("Core error: {0}")]
    Core(#[from] edge_config_and_utils::CoreError),

    /// Transport could not be constructed
    #[error("Transport error: {0}")]
    Transport(#[from] edge_network::TransportError),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Result type alias using EdgeError.
pub type EdgeResult<T> = Result<T, EdgeError>;
