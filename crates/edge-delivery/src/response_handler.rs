//! Decodes Edge Network responses and turns them into host events.
//!
//! A response document has up to three arrays. `handle` carries result
//! items, `errors` and `warnings` carry report items. Items addressed to one
//! event of the batch name it by `eventIndex`; the handler maps that back to
//! the event id through the [`WaitingEventsTable`].

use crate::event::{event_source, event_type, Event};
use crate::providers::EventDispatcher;
use crate::store_payload::StoreResponsePayloadManager;
use crate::waiting_events::WaitingEventsTable;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

const STORE_HANDLE: &str = "state:store";

const RESPONSE_EVENT_NAME: &str = "AEP Response Event Handle";
const ERROR_EVENT_NAME: &str = "AEP Error Response";

/// Whether an item was a failure or a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportKind {
    Error,
    Warning,
}

pub struct NetworkResponseHandler {
    waiting: WaitingEventsTable,
    dispatcher: Arc<dyn EventDispatcher>,
    store_payloads: Arc<StoreResponsePayloadManager>,
}

impl NetworkResponseHandler {
    pub fn new(dispatcher: Arc<dyn EventDispatcher>, store_payloads: Arc<StoreResponsePayloadManager>) -> Self {
        Self {
            waiting: WaitingEventsTable::new(),
            dispatcher,
            store_payloads,
        }
    }

    /// Register the batch of `request_id` right before it is sent.
    pub fn add_waiting_events(&self, request_id: &str, events: &[Event]) {
        self.waiting.add(request_id, events.iter().map(|e| e.id).collect());
    }

    pub fn remove_waiting_events(&self, request_id: &str) -> Option<Vec<Uuid>> {
        self.waiting.remove(request_id)
    }

    pub fn waiting_events(&self, request_id: &str) -> Option<Vec<Uuid>> {
        self.waiting.get(request_id)
    }

    /// Handle one complete response document (a streamed record or a whole body).
    pub fn process_response(&self, request_id: &str, json: &str) {
        if self.waiting.get(request_id).is_none() {
            warn!(request_id, "Response fragment for a request that is no longer waiting");
        }

        let document: Value = match serde_json::from_str(json) {
            Ok(value) => value,
            Err(e) => {
                warn!(request_id, error = %e, "Ignoring unparseable response fragment");
                return;
            }
        };

        for item in array(&document, "handle") {
            self.handle_item(request_id, item);
        }
        for item in array(&document, "errors") {
            self.report_item(request_id, item, ReportKind::Error);
        }
        for item in array(&document, "warnings") {
            self.report_item(request_id, item, ReportKind::Warning);
        }
    }

    /// Handle the body of a non-2xx response.
    ///
    /// Accepted shapes: a document with an `errors` array, or a single
    /// problem document. Anything else becomes one batch-level error.
    pub fn process_error(&self, request_id: &str, status: Option<u16>, body: &str) {
        match serde_json::from_str::<Value>(body) {
            Ok(document) if document.get("errors").is_some_and(Value::is_array) => {
                for item in array(&document, "errors") {
                    self.report_item(request_id, item, ReportKind::Error);
                }
            }
            Ok(Value::Object(document))
                if document.contains_key("title") || document.contains_key("type") =>
            {
                let mut item = document;
                if let Some(status) = status {
                    item.entry("status").or_insert_with(|| Value::from(status));
                }
                self.report_item(request_id, &Value::Object(item), ReportKind::Error);
            }
            _ => {
                let mut item = Map::new();
                item.insert("title".to_string(), Value::from("Unexpected Error"));
                item.insert(
                    "detail".to_string(),
                    Value::from(if body.trim().is_empty() {
                        "Request to Edge Network failed with an unknown error"
                    } else {
                        body.trim()
                    }),
                );
                if let Some(status) = status {
                    item.insert("status".to_string(), Value::from(status));
                }
                self.report_item(request_id, &Value::Object(item), ReportKind::Error);
            }
        }
    }

    fn handle_item(&self, request_id: &str, item: &Value) {
        let Some(fields) = item.as_object() else {
            warn!(request_id, "Ignoring non-object handle item");
            return;
        };
        let handle_type = fields.get("type").and_then(Value::as_str);

        if handle_type == Some(STORE_HANDLE) {
            if let Some(payloads) = fields.get("payload").and_then(Value::as_array) {
                self.store_payloads.save_payloads(payloads);
            }
        }

        let Ok(request_event_id) = self.resolve_index(request_id, fields.get("eventIndex")) else {
            return;
        };

        let mut data = fields.clone();
        data.remove("eventIndex");
        let source = handle_type.unwrap_or(event_source::RESPONSE_CONTENT).to_string();
        self.dispatch(RESPONSE_EVENT_NAME, source, request_id, request_event_id, data);
    }

    fn report_item(&self, request_id: &str, item: &Value, kind: ReportKind) {
        let Some(fields) = item.as_object() else {
            warn!(request_id, "Ignoring non-object report item");
            return;
        };

        let index = fields
            .get("eventIndex")
            .or_else(|| fields.get("report").and_then(|report| report.get("eventIndex")));
        let Ok(request_event_id) = self.resolve_index(request_id, index) else {
            return;
        };

        let mut data = fields.clone();
        data.remove("eventIndex");
        if let Some(Value::Object(report)) = data.get_mut("report") {
            report.remove("eventIndex");
        }

        match kind {
            ReportKind::Error => warn!(request_id, item = %item, "Edge Network reported an error"),
            ReportKind::Warning => debug!(request_id, item = %item, "Edge Network reported a warning"),
        }
        self.dispatch(
            ERROR_EVENT_NAME,
            event_source::ERROR_RESPONSE_CONTENT.to_string(),
            request_id,
            request_event_id,
            data,
        );
    }

    /// `Ok(None)` for batch-level items, `Ok(Some(id))` for a known index,
    /// `Err(())` when the index does not name an event of the batch.
    fn resolve_index(&self, request_id: &str, index: Option<&Value>) -> Result<Option<Uuid>, ()> {
        let Some(index) = index else {
            return Ok(None);
        };
        let resolved = index
            .as_u64()
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| self.waiting.event_at(request_id, i));
        match resolved {
            Some(id) => Ok(Some(id)),
            None => {
                warn!(request_id, event_index = %index, "Response item names an unknown event index");
                Err(())
            }
        }
    }

    fn dispatch(
        &self,
        name: &str,
        source: String,
        request_id: &str,
        request_event_id: Option<Uuid>,
        mut data: Map<String, Value>,
    ) {
        data.insert("requestId".to_string(), Value::from(request_id));
        if let Some(id) = request_event_id {
            data.insert("requestEventId".to_string(), Value::from(id.to_string()));
        }
        self.dispatcher
            .dispatch(Event::new(name, event_type::EDGE, source, Some(data)));
    }
}

fn array<'a>(document: &'a Value, key: &str) -> &'a [Value] {
    document
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
