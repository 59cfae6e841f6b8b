//! Host-supplied interfaces.
//!
//! The pipeline never resolves shared state itself. Each provider returns
//! `None` while its state is pending; the hit processor turns that into
//! `NotReady` and the host calls `Edge::handle_shared_state_change` when it
//! settles.

use crate::device::{DeviceType, ScreenOrientation};
use crate::event::Event;
use crate::privacy::PrivacyStatus;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Configuration shared-state key for the datastream id.
pub const CONFIG_ID_KEY: &str = "edge.configId";
/// Configuration shared-state key for a custom Edge domain.
pub const DOMAIN_KEY: &str = "edge.domain";
/// Configuration shared-state key for the privacy status.
pub const PRIVACY_KEY: &str = "global.privacy";

/// Source of the remote configuration shared state.
pub trait ConfigurationProvider: Send + Sync {
    /// Current configuration. `None` while pending.
    fn configuration(&self) -> Option<Map<String, Value>>;
}

/// Source of the identity shared state.
pub trait IdentityProvider: Send + Sync {
    /// Current identity map. `None` while pending.
    fn identity(&self) -> Option<Map<String, Value>>;
}

/// Source of the consent shared state.
pub trait ConsentProvider: Send + Sync {
    /// Current consent document, e.g. `{"consents": {"collect": {"val": "y"}}}`.
    fn consent(&self) -> Option<Value>;
}

/// Facts about the host device, read on every send. Unknown facts stay `None`.
pub trait SystemInfoProvider: Send + Sync {
    fn manufacturer(&self) -> Option<String> {
        None
    }

    /// Model name, sent as `xdm.device.model`.
    fn device_name(&self) -> Option<String> {
        None
    }

    /// Screen `(width, height)` in pixels.
    fn display_size(&self) -> Option<(u32, u32)> {
        None
    }

    fn orientation(&self) -> Option<ScreenOrientation> {
        None
    }

    fn device_type(&self) -> Option<DeviceType> {
        None
    }
}

/// Outbound sink for response and error events.
pub trait EventDispatcher: Send + Sync {
    fn dispatch(&self, event: Event);
}

/// Small persisted key/value storage owned by the host.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String);

    /// Remove a key. Returns whether it existed.
    fn remove(&self, key: &str) -> bool;

    fn keys(&self) -> Vec<String>;
}

/// Process-local [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries.lock().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }
}

/// The parts of the configuration shared state the pipeline reads.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeConfiguration {
    /// Present and non-empty, or `None`.
    pub config_id: Option<String>,
    pub domain: Option<String>,
    pub privacy: PrivacyStatus,
}

impl EdgeConfiguration {
    pub fn from_map(config: &Map<String, Value>) -> Self {
        Self {
            config_id: non_empty_str(config.get(CONFIG_ID_KEY)),
            domain: non_empty_str(config.get(DOMAIN_KEY)),
            privacy: config
                .get(PRIVACY_KEY)
                .and_then(Value::as_str)
                .map(PrivacyStatus::from_config_value)
                .unwrap_or(PrivacyStatus::Unknown),
        }
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// ECID from an identity map: `identityMap.ECID[0].id`, else top-level `mid`.
pub fn ecid_from_identity(identity: &Map<String, Value>) -> Option<String> {
    let from_map = identity
        .get("identityMap")
        .and_then(|map| map.get("ECID"))
        .and_then(Value::as_array)
        .and_then(|ids| ids.first())
        .and_then(|first| first.get("id"));

    non_empty_str(from_map).or_else(|| non_empty_str(identity.get("mid")))
}
