//! Network transport for edge hits.
//!
//! [`Transport`] is the seam the hit processor sends through. A send reports
//! one of three outcomes: success (the body has been streamed to the
//! [`ResponseSink`]), a retryable failure, or an unrecoverable failure carrying
//! the error body. [`HttpTransport`] implements it on `reqwest`.

mod error;
mod http;
mod request;
mod transport;

pub use error::{TransportError, TransportResult};
pub use http::{HttpTransport, HttpTransportConfig};
pub use request::NetworkRequest;
pub use transport::{CollectingSink, ResponseSink, Transport, TransportOutcome};
