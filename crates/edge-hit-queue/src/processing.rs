//! The processor seam.

use crate::DataEntity;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Why a hit left the queue without being delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Payload missing, undecodable, or not serializable into a request.
    Malformed,
    /// Privacy was opted out when the hit came up for sending.
    PrivacyOptedOut,
    /// The server rejected the request in a way retrying cannot fix.
    Unrecoverable,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DropReason::Malformed => "malformed",
            DropReason::PrivacyOptedOut => "privacy_opted_out",
            DropReason::Unrecoverable => "unrecoverable",
        };
        f.write_str(name)
    }
}

/// What the driver should do with the head after processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitDisposition {
    /// Delivered (or a control hit applied). Remove.
    Completed,
    /// Remove without delivery.
    Dropped(DropReason),
    /// Keep; offer again after the interval.
    Retry(Duration),
    /// Keep; offer again on the next wake.
    NotReady,
}

impl HitDisposition {
    /// Whether the head leaves the queue.
    pub fn removes_head(&self) -> bool {
        matches!(self, HitDisposition::Completed | HitDisposition::Dropped(_))
    }
}

/// Turns one stored entity into a delivery attempt.
#[async_trait]
pub trait HitProcessing: Send + Sync {
    /// Interval to wait before offering `entity` again after a failed attempt.
    fn retry_interval(&self, entity: &DataEntity) -> Duration;

    async fn process_hit(&self, entity: &DataEntity) -> HitDisposition;
}
