//! Server-issued `state:store` payloads.
//!
//! The Edge Network asks the client to keep small key/value pairs (the
//! equivalent of cookies) and send them back on every request until they
//! expire.

use crate::providers::KeyValueStore;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

const KEY_PREFIX: &str = "edge.storePayload.";

/// One stored payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreResponsePayload {
    pub key: String,
    pub value: String,
    /// Lifetime in seconds as sent by the server.
    pub max_age: i64,
    pub expires_at: DateTime<Utc>,
}

impl StoreResponsePayload {
    /// Parse one `state:store` payload item. Items without `key` are ignored.
    pub fn from_item(item: &Value, now: DateTime<Utc>) -> Option<Self> {
        let key = item.get("key")?.as_str()?.to_string();
        if key.is_empty() {
            return None;
        }
        let value = match item.get("value") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let max_age = item.get("maxAge").and_then(Value::as_i64).unwrap_or(0);

        let expires_at = ChronoDuration::try_seconds(max_age.max(0))
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Some(Self {
            key,
            value,
            max_age,
            expires_at,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Entry format under `meta.state.entries`.
    pub fn to_state_entry(&self) -> Value {
        json!({
            "key": self.key,
            "value": self.value,
            "maxAge": self.max_age,
        })
    }
}

/// Persists store payloads in the host key/value store.
pub struct StoreResponsePayloadManager {
    store: Arc<dyn KeyValueStore>,
}

impl StoreResponsePayloadManager {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Save every item of a `state:store` handle payload. `maxAge <= 0` deletes.
    pub fn save_payloads(&self, items: &[Value]) {
        let now = Utc::now();
        for item in items {
            let Some(payload) = StoreResponsePayload::from_item(item, now) else {
                warn!(item = %item, "Ignoring state:store item without key");
                continue;
            };

            let storage_key = format!("{}{}", KEY_PREFIX, payload.key);
            if payload.max_age <= 0 {
                self.store.remove(&storage_key);
                debug!(key = %payload.key, "Store payload removed");
                continue;
            }

            match serde_json::to_string(&payload) {
                Ok(encoded) => {
                    self.store.set(&storage_key, encoded);
                    debug!(key = %payload.key, max_age = payload.max_age, "Store payload saved");
                }
                Err(e) => warn!(key = %payload.key, error = %e, "Failed to encode store payload"),
            }
        }
    }

    /// Unexpired payloads. Expired or unreadable entries are deleted.
    pub fn active_payloads(&self) -> Vec<StoreResponsePayload> {
        let now = Utc::now();
        let mut active = Vec::new();

        for storage_key in self.owned_keys() {
            let Some(raw) = self.store.get(&storage_key) else {
                continue;
            };
            match serde_json::from_str::<StoreResponsePayload>(&raw) {
                Ok(payload) if !payload.is_expired(now) => active.push(payload),
                Ok(_) => {
                    self.store.remove(&storage_key);
                }
                Err(e) => {
                    warn!(key = %storage_key, error = %e, "Dropping unreadable store payload");
                    self.store.remove(&storage_key);
                }
            }
        }
        active
    }

    /// Delete every stored payload.
    pub fn delete_all(&self) {
        let keys = self.owned_keys();
        let removed = keys.len();
        for key in keys {
            self.store.remove(&key);
        }
        debug!(removed, "Store payloads purged");
    }

    fn owned_keys(&self) -> Vec<String> {
        self.store
            .keys()
            .into_iter()
            .filter(|key| key.starts_with(KEY_PREFIX))
            .collect()
    }
}
