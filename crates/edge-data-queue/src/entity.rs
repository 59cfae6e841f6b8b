//! Stored queue entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One opaque queue entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEntity {
    /// Caller-chosen identifier (the originating event id for content hits).
    pub unique_id: String,
    pub timestamp: DateTime<Utc>,
    /// Encoded hit. `None` is stored as SQL NULL and reported back as such.
    pub data: Option<Vec<u8>>,
}

impl DataEntity {
    pub fn new(unique_id: impl Into<String>, data: Option<Vec<u8>>) -> Self {
        Self {
            unique_id: unique_id.into(),
            timestamp: Utc::now(),
            data,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entity_keeps_id_and_data() {
        let entity = DataEntity::new("evt-1", Some(b"{}".to_vec()));
        assert_eq!(entity.unique_id, "evt-1");
        assert_eq!(entity.data.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn with_timestamp_overrides_creation_time() {
        let ts = DateTime::parse_from_rfc3339("2026-01-15T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let entity = DataEntity::new("evt-2", None).with_timestamp(ts);
        assert_eq!(entity.timestamp, ts);
        assert!(entity.data.is_none());
    }
}
