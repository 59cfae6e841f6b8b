//! The transport seam.

use crate::NetworkRequest;
use async_trait::async_trait;
use std::time::Duration;

/// Receives the body of a successful response as it arrives.
///
/// Chunks are raw bytes in arrival order; record boundaries are the sink's
/// business.
pub trait ResponseSink: Send {
    fn on_chunk(&mut self, chunk: &[u8]);
}

/// Result of one [`Transport::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOutcome {
    /// 2xx. The full body has been delivered to the sink.
    Success { status: u16 },
    /// Connection error, timeout, 408, 429 or 5xx once internal attempts ran out.
    Retryable {
        status: Option<u16>,
        /// Server-provided `Retry-After`, if any.
        retry_after: Option<Duration>,
        reason: String,
        /// Error body of the last failed attempt, when the server sent one.
        body: Option<String>,
    },
    /// Any other non-2xx, or a request that can never succeed as built.
    Unrecoverable { status: Option<u16>, body: String },
}

impl TransportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransportOutcome::Success { .. })
    }
}

/// Sends a request and streams the response into a sink.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: NetworkRequest, sink: &mut dyn ResponseSink) -> TransportOutcome;
}

/// Sink that keeps every chunk, for callers that want the whole body.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub chunks: Vec<Vec<u8>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(&self) -> Vec<u8> {
        self.chunks.concat()
    }
}

impl ResponseSink for CollectingSink {
    fn on_chunk(&mut self, chunk: &[u8]) {
        self.chunks.push(chunk.to_vec());
    }
}
