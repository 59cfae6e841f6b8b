//! # Persistent hit queue
//!
//! Drives entities from a [`DataQueue`] through a [`HitProcessing`]
//! implementation, one at a time, in insertion order.
//!
//! ## Invariants
//!
//! - **One in flight**: a single driver task awaits the processor inline, so
//!   at most one hit is being processed at any moment.
//! - **Head of line**: the head is removed only once the processor reports
//!   `Completed` or `Dropped`. `Retry` and `NotReady` keep it in place.
//! - **Retry spacing**: after `Retry(d)` the head is not offered again before
//!   `d` has elapsed.
//! - **No busy loop**: with nothing to do the driver parks until an append,
//!   a [`PersistentHitQueue::wake`], a gate change or close.
//!
//! ```text
//!   queue() ──▶ DataQueue ──peek──▶ driver ──process_hit──▶ HitProcessing
//!                   ▲                  │
//!                   └──── remove ◀─────┘  (Completed | Dropped)
//! ```

mod processing;
mod queue;

pub use edge_data_queue::{DataEntity, DataQueue, QueueError, QueueResult};
pub use processing::{DropReason, HitDisposition, HitProcessing};
pub use queue::PersistentHitQueue;
