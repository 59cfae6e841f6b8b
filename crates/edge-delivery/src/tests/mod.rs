//! Integration tests for edge delivery.
//!
//! Test organization:
//!
//! - `harness.rs`    - Mock transport, settable providers, recording dispatcher
//! - `delivery.rs`   - I. Ordering, single flight and request shape
//! - `streaming.rs`  - II. Streamed response correlation
//! - `privacy.rs`    - III. Privacy gating
//! - `readiness.rs`  - IV. Configuration and identity readiness
//! - `failures.rs`   - V. Malformed hits, retries and rejected requests
//! - `consent.rs`    - VI. Collect consent and consent updates
//! - `reset.rs`      - VII. Identity reset ordering
//! - `durability.rs` - VIII. Restart survival

mod consent;
mod delivery;

#[allow(unused_imports)]
pub use harness::{MockTransport, RecordingDispatcher, SharedState, TestHarness};
