//! Per-hit retry intervals.
//!
//! Volatile by choice: after a restart every hit starts again from the
//! initial interval.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(5),
            max: Duration::from_secs(300),
        }
    }
}

/// Interval last used for each entity id.
#[derive(Debug, Default)]
pub struct RetryState {
    policy: RetryPolicy,
    intervals: Mutex<HashMap<String, Duration>>,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            intervals: Mutex::new(HashMap::new()),
        }
    }

    /// Record a failed attempt and return the wait before the next one.
    ///
    /// A non-zero server `Retry-After` is used as given. Otherwise the first
    /// failure waits the initial interval and each further one doubles, up to
    /// `max`. Doubling never starts below the initial interval.
    pub fn next_interval(&self, entity_id: &str, retry_after: Option<Duration>) -> Duration {
        let mut intervals = self.intervals.lock();
        let next = match retry_after.filter(|d| !d.is_zero()) {
            Some(retry_after) => retry_after,
            None => match intervals.get(entity_id) {
                Some(previous) => (*previous)
                    .max(self.policy.initial)
                    .saturating_mul(2)
                    .min(self.policy.max),
                None => self.policy.initial,
            },
        };
        intervals.insert(entity_id.to_string(), next);
        next
    }

    /// Current interval for `entity_id`, the initial one when none is stored.
    pub fn interval(&self, entity_id: &str) -> Duration {
        self.intervals
            .lock()
            .get(entity_id)
            .copied()
            .unwrap_or(self.policy.initial)
    }

    pub fn clear(&self, entity_id: &str) {
        self.intervals.lock().remove(entity_id);
    }
}
