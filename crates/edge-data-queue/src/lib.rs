//! Durable FIFO store for queued hits.
//!
//! Entities are opaque to this crate: a unique id, a creation timestamp and
//! an optional byte payload. Order is insertion order, an acknowledged
//! [`DataQueue::add`] survives an unclean exit, and a removed entity is never
//! returned again.

mod entity;
mod error;
mod migrations;
mod queue;
mod sqlite;

pub use entity::DataEntity;
pub use error::{QueueError, QueueResult};
pub use queue::DataQueue;
pub use sqlite::SqliteDataQueue;
