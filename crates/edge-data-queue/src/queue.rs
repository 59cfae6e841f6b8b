//! The store abstraction the hit queue is driven through.

use crate::{DataEntity, QueueResult};

/// An ordered, durable collection of [`DataEntity`] values.
///
/// Implementations must be safe to share between the submitting side and the
/// single driver task. After [`DataQueue::close`] every call returns
/// [`crate::QueueError::Closed`].
pub trait DataQueue: Send + Sync {
    /// Append at the tail.
    fn add(&self, entity: &DataEntity) -> QueueResult<()>;

    /// The head entity, without removing it.
    fn peek(&self) -> QueueResult<Option<DataEntity>>;

    /// Up to `n` entities from the head, in order.
    fn peek_n(&self, n: usize) -> QueueResult<Vec<DataEntity>>;

    /// Delete every entity stored under `unique_id`. Returns whether anything was removed.
    fn remove(&self, unique_id: &str) -> QueueResult<bool>;

    fn count(&self) -> QueueResult<usize>;

    fn clear(&self) -> QueueResult<()>;

    fn close(&self);
}
