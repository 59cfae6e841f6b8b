//! Request id to event ids, for correlating response items.

use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

/// Events of in-flight requests, in request order.
#[derive(Debug, Default)]
pub struct WaitingEventsTable {
    entries: Mutex<HashMap<String, Vec<Uuid>>>,
}

impl WaitingEventsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the events of `request_id`.
    pub fn add(&self, request_id: &str, event_ids: Vec<Uuid>) {
        self.entries.lock().insert(request_id.to_string(), event_ids);
    }

    pub fn remove(&self, request_id: &str) -> Option<Vec<Uuid>> {
        self.entries.lock().remove(request_id)
    }

    pub fn get(&self, request_id: &str) -> Option<Vec<Uuid>> {
        self.entries.lock().get(request_id).cloned()
    }

    /// Event id at `index` of `request_id`'s batch.
    pub fn event_at(&self, request_id: &str, index: usize) -> Option<Uuid> {
        self.entries.lock().get(request_id)?.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_lookup_remove() {
        let table = WaitingEventsTable::new();
        let ids = vec![Uuid::new_v4(), Uuid::new_v4()];
        table.add("req-1", ids.clone());

        assert_eq!(table.get("req-1"), Some(ids.clone()));
        assert_eq!(table.event_at("req-1", 1), Some(ids[1]));
        assert_eq!(table.event_at("req-1", 2), None);
        assert_eq!(table.event_at("req-2", 0), None);

        assert_eq!(table.remove("req-1"), Some(ids));
        assert!(table.remove("req-1").is_none());
        assert!(table.is_empty());
    }
}
