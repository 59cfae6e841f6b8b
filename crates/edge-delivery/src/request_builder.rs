//! Request payload construction.
//!
//! One event per request. Every request asks the server to stream its
//! response using [`StreamingSettings::default`].

use crate::device::Device;
use crate::environment::EnvironmentType;
use crate::event::Event;
use crate::hit::{EdgeRequest, StreamingSettings};
use crate::store_payload::StoreResponsePayload;
use chrono::SecondsFormat;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

const IMPLEMENTATION_NAME: &str = "https://ns.adobe.com/experience/mobilesdk/rust";

/// Per-request inputs resolved by the processor at send time.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub ecid: Option<String>,
    pub store_payloads: Vec<StoreResponsePayload>,
    pub environment: Option<EnvironmentType>,
    pub device: Option<Device>,
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct RequestBuilder {
    version: String,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Experience request for `events`. `None` when an event has no `xdm`
    /// object or the payload cannot be serialized.
    pub fn build_experience_request(&self, events: &[Event], context: &RequestContext) -> Option<EdgeRequest> {
        if events.is_empty() {
            return None;
        }

        let mut serialized = Vec::with_capacity(events.len());
        for event in events {
            match experience_event_json(event) {
                Some(value) => serialized.push(value),
                None => {
                    warn!(event_id = %event.id, "Event has no usable xdm data");
                    return None;
                }
            }
        }

        let streaming = StreamingSettings::default();
        let mut meta = Map::new();
        meta.insert("konductorConfig".to_string(), konductor_config(&streaming));
        if !context.store_payloads.is_empty() {
            let entries: Vec<Value> = context.store_payloads.iter().map(|p| p.to_state_entry()).collect();
            meta.insert("state".to_string(), json!({ "entries": entries }));
        }

        let mut xdm = Map::new();
        if let Some(identity_map) = identity_map(context.ecid.as_deref()) {
            xdm.insert("identityMap".to_string(), identity_map);
        }
        xdm.insert("implementationDetails".to_string(), self.implementation_details());
        if let Some(environment) = context.environment {
            xdm.insert("environment".to_string(), json!({ "type": environment.as_str() }));
        }
        if let Some(device) = &context.device {
            match serde_json::to_value(device) {
                Ok(device) => {
                    xdm.insert("device".to_string(), device);
                }
                Err(e) => warn!(error = %e, "Device details could not be encoded, leaving them out"),
            }
        }

        let payload = json!({
            "meta": meta,
            "xdm": xdm,
            "events": serialized,
        });

        checked(payload, streaming)
    }

    /// Consent update request. `None` when the event carries no `consents` object.
    pub fn build_consent_request(&self, event: &Event, context: &RequestContext) -> Option<EdgeRequest> {
        let consents = event
            .data
            .as_ref()
            .and_then(|data| data.get("consents"))
            .filter(|consents| consents.is_object())?
            .clone();

        let streaming = StreamingSettings::default();
        let mut payload = Map::new();
        payload.insert(
            "consent".to_string(),
            json!([{ "standard": "Adobe", "version": "2.0", "value": consents }]),
        );
        if let Some(identity_map) = identity_map(context.ecid.as_deref()) {
            payload.insert("identityMap".to_string(), identity_map);
        }
        payload.insert(
            "meta".to_string(),
            json!({ "konductorConfig": konductor_config(&streaming) }),
        );

        checked(Value::Object(payload), streaming)
    }

    fn implementation_details(&self) -> Value {
        json!({
            "name": IMPLEMENTATION_NAME,
            "version": self.version,
            "environment": "app",
        })
    }
}

fn konductor_config(streaming: &StreamingSettings) -> Value {
    json!({
        "streaming": {
            "enabled": true,
            "recordSeparator": streaming.record_separator,
            "lineFeed": streaming.line_feed,
        }
    })
}

fn identity_map(ecid: Option<&str>) -> Option<Value> {
    let ecid = ecid?;
    Some(json!({
        "ECID": [{ "id": ecid, "authenticatedState": "ambiguous", "primary": false }]
    }))
}

/// `{"xdm": {..event xdm, "_id", "timestamp"}, "data"?, "meta"?}`
fn experience_event_json(event: &Event) -> Option<Value> {
    let data = event.data.as_ref()?;
    let mut xdm = data.get("xdm")?.as_object()?.clone();
    xdm.insert("_id".to_string(), Value::String(event.id.to_string()));
    xdm.insert(
        "timestamp".to_string(),
        Value::String(event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );

    let mut out = Map::new();
    out.insert("xdm".to_string(), Value::Object(xdm));
    if let Some(extra) = data.get("data").filter(|d| d.is_object()) {
        out.insert("data".to_string(), extra.clone());
    }
    if let Some(dataset_id) = data.get("datasetId").and_then(Value::as_str).map(str::trim) {
        if !dataset_id.is_empty() {
            out.insert("meta".to_string(), json!({ "collect": { "datasetId": dataset_id } }));
        }
    }
    Some(Value::Object(out))
}

/// Serialization gate: the payload must render to a string.
fn checked(payload: Value, streaming: StreamingSettings) -> Option<EdgeRequest> {
    match serde_json::to_string(&payload) {
        Ok(body) => Some(EdgeRequest {
            payload,
            body,
            streaming: Some(streaming),
        }),
        Err(e) => {
            warn!(error = %e, "Request payload could not be serialized");
            None
        }
    }
}
