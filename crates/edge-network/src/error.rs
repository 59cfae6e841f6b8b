//! Transport error types.

use thiserror::Error;

/// Errors raised while setting up a transport.
///
/// Failures of an individual send are reported as a
/// [`crate::TransportOutcome`], not as an error.
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias using TransportError.
pub type TransportResult<T> = Result<T, TransportError>;
