//! Events flowing in from the host and back out as responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Event type strings.
pub mod event_type {
    pub const EDGE: &str = "com.adobe.eventType.edge";
    pub const EDGE_CONSENT: &str = "com.adobe.eventType.edgeConsent";
    pub const GENERIC_IDENTITY: &str = "com.adobe.eventType.genericIdentity";
}

/// Event source strings.
pub mod event_source {
    pub const REQUEST_CONTENT: &str = "com.adobe.eventSource.requestContent";
    pub const RESPONSE_CONTENT: &str = "com.adobe.eventSource.responseContent";
    pub const ERROR_RESPONSE_CONTENT: &str = "com.adobe.eventSource.errorResponseContent";
    pub const UPDATE_CONSENT: &str = "com.adobe.eventSource.updateConsent";
    pub const REQUEST_RESET: &str = "com.adobe.eventSource.requestReset";
}

/// An immutable host event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub event_type: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl Event {
    pub fn new(
        name: impl Into<String>,
        event_type: impl Into<String>,
        source: impl Into<String>,
        data: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            event_type: event_type.into(),
            source: source.into(),
            timestamp: Utc::now(),
            data,
        }
    }

    /// An experience event as submitted through `Edge::send_event`.
    pub fn experience(data: Map<String, Value>) -> Self {
        Self::new(
            "AEP Request Event",
            event_type::EDGE,
            event_source::REQUEST_CONTENT,
            Some(data),
        )
    }

    /// A consent update as submitted through `Edge::update_consent`.
    pub fn consent_update(data: Map<String, Value>) -> Self {
        Self::new(
            "Consent Update",
            event_type::EDGE_CONSENT,
            event_source::UPDATE_CONSENT,
            Some(data),
        )
    }

    /// `true` when the event carries a non-empty data map.
    pub fn has_data(&self) -> bool {
        self.data.as_ref().is_some_and(|data| !data.is_empty())
    }
}
