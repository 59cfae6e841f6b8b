//! # Edge delivery
//!
//! Durable, at-least-once delivery of experience events to the Edge Network.
//!
//! Events submitted through [`Edge`] are persisted as [`QueuedHit`]s and
//! sent one at a time, in order, by the queue driver. Each send resolves
//! configuration and identity at that moment, builds a single-event request
//! and streams the response back through [`NetworkResponseHandler`], which
//! correlates every item to the event that caused it.
//!
//! Hits are held while privacy is unknown, dropped when it is opted out, and
//! retried with growing intervals when the network fails.

mod consent;
mod device;
mod edge;
mod environment;
mod error;
mod event;
mod hit;
mod hit_processor;
mod privacy;
mod providers;
mod request_builder;
mod response_handler;
mod retry;
mod store_payload;
mod streaming;
mod waiting_events;

#[cfg(test)]
mod tests;

pub use consent::{CollectConsent, ConsentStatus};
pub use device::{Device, DeviceType, ScreenOrientation};
pub use edge::{Edge, EdgeDependencies, EdgeSettings};
pub use environment::EnvironmentType;
pub use error::{EdgeError, EdgeResult};
pub use event::{event_source, event_type, Event};
pub use hit::{EdgeHit, EdgeRequest, QueuedHit, RequestType, StreamingSettings};
pub use hit_processor::EdgeHitProcessor;
pub use privacy::{PrivacyGate, PrivacyStatus};
pub use providers::{
    ecid_from_identity, ConfigurationProvider, ConsentProvider, EdgeConfiguration, EventDispatcher,
    IdentityProvider, KeyValueStore, MemoryKeyValueStore, SystemInfoProvider, CONFIG_ID_KEY, DOMAIN_KEY,
    PRIVACY_KEY,
};
pub use request_builder::{RequestBuilder, RequestContext};
pub use response_handler::NetworkResponseHandler;
pub use retry::{RetryPolicy, RetryState};
pub use store_payload::{StoreResponsePayload, StoreResponsePayloadManager};
pub use streaming::{RecordAssembler, StreamingResponseSink};
pub use waiting_events::WaitingEventsTable;
