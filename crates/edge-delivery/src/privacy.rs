//! Privacy status and the gate the queue driver follows.

use crate::store_payload::StoreResponsePayloadManager;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Process-wide privacy status from the `global.privacy` configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrivacyStatus {
    OptedIn,
    OptedOut,
    #[default]
    Unknown,
}

impl PrivacyStatus {
    /// `optedin` / `optedout`; anything else is unknown.
    pub fn from_config_value(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "optedin" => PrivacyStatus::OptedIn,
            "optedout" => PrivacyStatus::OptedOut,
            _ => PrivacyStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyStatus::OptedIn => "optedin",
            PrivacyStatus::OptedOut => "optedout",
            PrivacyStatus::Unknown => "optunknown",
        }
    }
}

impl fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owner of the current [`PrivacyStatus`].
///
/// Two watch channels are kept in step: the status itself, and a boolean
/// dispatch gate handed to the hit queue (`true` only when opted in).
pub struct PrivacyGate {
    status: watch::Sender<PrivacyStatus>,
    dispatch: watch::Sender<bool>,
    store_payloads: Arc<StoreResponsePayloadManager>,
}

impl PrivacyGate {
    /// Starts at [`PrivacyStatus::Unknown`].
    pub fn new(store_payloads: Arc<StoreResponsePayloadManager>) -> Self {
        let (status, _) = watch::channel(PrivacyStatus::Unknown);
        let (dispatch, _) = watch::channel(false);
        Self {
            status,
            dispatch,
            store_payloads,
        }
    }

    /// Apply a new status. Opting out purges stored response payloads before
    /// returning; already queued hits stay in storage.
    pub fn set_status(&self, status: PrivacyStatus) {
        let previous = self.status.send_replace(status);
        self.dispatch.send_replace(status == PrivacyStatus::OptedIn);

        if status == PrivacyStatus::OptedOut {
            self.store_payloads.delete_all();
        }
        if previous != status {
            info!(from = %previous, to = %status, "Privacy status changed");
        }
    }

    pub fn status(&self) -> PrivacyStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PrivacyStatus> {
        self.status.subscribe()
    }

    /// Receiver for the hit queue: `true` while hits may be dequeued.
    pub fn dispatch_gate(&self) -> watch::Receiver<bool> {
        self.dispatch.subscribe()
    }

    pub fn can_send(&self) -> bool {
        self.status() == PrivacyStatus::OptedIn
    }
}
