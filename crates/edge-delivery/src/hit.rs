//! Persisted hit payloads and the in-memory hit built from them.

use crate::event::Event;
use crate::EdgeResult;
use chrono::{DateTime, Utc};
use edge_data_queue::DataEntity;
use edge_network::NetworkRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;
use uuid::Uuid;

/// What is stored in a [`DataEntity`]'s data.
///
/// The request id is fixed at submission so every retry of the same hit
/// carries the same id and the server can deduplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueuedHit {
    Experience { request_id: Uuid, event: Event },
    Consent { request_id: Uuid, event: Event },
    /// Purge locally stored response payloads. Never sent.
    Reset { timestamp: DateTime<Utc> },
}

impl QueuedHit {
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Content hits are keyed by their event id, resets by a fresh id.
    pub fn unique_id(&self) -> String {
        match self {
            QueuedHit::Experience { event, .. } | QueuedHit::Consent { event, .. } => event.id.to_string(),
            QueuedHit::Reset { .. } => Uuid::new_v4().to_string(),
        }
    }

    pub fn to_entity(&self) -> EdgeResult<DataEntity> {
        let timestamp = match self {
            QueuedHit::Experience { event, .. } | QueuedHit::Consent { event, .. } => event.timestamp,
            QueuedHit::Reset { timestamp } => *timestamp,
        };
        Ok(DataEntity::new(self.unique_id(), Some(self.encode()?)).with_timestamp(timestamp))
    }
}

/// Edge endpoint family member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Interact,
    SetConsent,
}

impl RequestType {
    pub fn path(&self) -> &'static str {
        match self {
            RequestType::Interact => "interact",
            RequestType::SetConsent => "privacy/set-consent",
        }
    }
}

/// Separator pair the server uses to chunk a streamed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingSettings {
    pub record_separator: String,
    pub line_feed: String,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            record_separator: "\u{0000}".to_string(),
            line_feed: "\n".to_string(),
        }
    }
}

/// Builder output: the JSON body plus how its response will be framed.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRequest {
    pub payload: Value,
    /// `payload` rendered once, as sent.
    pub body: String,
    pub streaming: Option<StreamingSettings>,
}

/// A hit ready to send.
#[derive(Debug, Clone)]
pub struct EdgeHit {
    pub config_id: String,
    pub request_id: Uuid,
    pub request_type: RequestType,
    pub payload: String,
    pub events: Vec<Event>,
    pub headers: BTreeMap<String, String>,
    pub streaming: Option<StreamingSettings>,
}

impl EdgeHit {
    /// `{base}/{path}?configId=..&requestId=..`
    pub fn url(&self, base: &Url) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&format!(
            "{}/{}",
            base.as_str().trim_end_matches('/'),
            self.request_type.path()
        ))?;
        url.query_pairs_mut()
            .append_pair("configId", &self.config_id)
            .append_pair("requestId", &self.request_id.to_string());
        Ok(url)
    }

    pub fn network_request(&self, base: &Url) -> Result<NetworkRequest, url::ParseError> {
        let mut request = NetworkRequest::post_json(self.url(base)?, self.payload.clone());
        for (name, value) in &self.headers {
            request = request.with_header(name.clone(), value.clone());
        }
        Ok(request)
    }
}
