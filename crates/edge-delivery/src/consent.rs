//! Collect consent as seen at event submission.

use crate::providers::ConsentProvider;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

/// `consents.collect.val`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentStatus {
    Yes,
    No,
    Pending,
}

impl ConsentStatus {
    /// Read `consents.collect.val` from a consent document. Absent or
    /// unparseable values are pending.
    pub fn from_consents(document: Option<&Value>) -> Self {
        let value = document
            .and_then(|doc| doc.get("consents"))
            .and_then(|consents| consents.get("collect"))
            .and_then(|collect| collect.get("val"))
            .and_then(Value::as_str);

        match value {
            Some("y") => ConsentStatus::Yes,
            Some("n") => ConsentStatus::No,
            _ => ConsentStatus::Pending,
        }
    }
}

/// Collect consent at submission. The provider's consent document is
/// authoritative whenever it has one; the latest preferences notification
/// only covers the time before the provider publishes.
#[derive(Debug, Default)]
pub struct CollectConsent {
    latest: Mutex<Option<ConsentStatus>>,
}

impl CollectConsent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the collect value carried by a consent-preferences update.
    pub fn update(&self, document: &Value) -> ConsentStatus {
        let status = ConsentStatus::from_consents(Some(document));
        *self.latest.lock() = Some(status);
        debug!(consent = ?status, "Collect consent updated");
        status
    }

    /// An unparseable provider document is pending, not a fallback.
    pub fn current(&self, provider: &dyn ConsentProvider) -> ConsentStatus {
        match provider.consent() {
            Some(document) => ConsentStatus::from_consents(Some(&document)),
            None => self.latest.lock().unwrap_or(ConsentStatus::Pending),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixed(Option<Value>);

    impl ConsentProvider for Fixed {
        fn consent(&self) -> Option<Value> {
            self.0.clone()
        }
    }

    #[test]
    fn parses_collect_values() {
        let doc = |v: &str| json!({"consents": {"collect": {"val": v}}});
        assert_eq!(ConsentStatus::from_consents(Some(&doc("y"))), ConsentStatus::Yes);
        assert_eq!(ConsentStatus::from_consents(Some(&doc("n"))), ConsentStatus::No);
        assert_eq!(ConsentStatus::from_consents(Some(&doc("p"))), ConsentStatus::Pending);
    }

    #[test]
    fn absent_or_unparseable_is_pending() {
        assert_eq!(ConsentStatus::from_consents(None), ConsentStatus::Pending);
        for doc in [
            json!({}),
            json!({"consents": "yes"}),
            json!({"consents": {"collect": {"val": 1}}}),
            json!({"consents": {"collect": {"val": "maybe"}}}),
        ] {
            assert_eq!(ConsentStatus::from_consents(Some(&doc)), ConsentStatus::Pending);
        }
    }

    #[test]
    fn provider_document_wins_over_preferences() {
        let consent = CollectConsent::new();
        consent.update(&json!({"consents": {"collect": {"val": "n"}}}));

        let provider = Fixed(Some(json!({"consents": {"collect": {"val": "y"}}})));
        assert_eq!(consent.current(&provider), ConsentStatus::Yes);

        let invalid = Fixed(Some(json!({"consents": "garbage"})));
        assert_eq!(consent.current(&invalid), ConsentStatus::Pending);
    }

    #[test]
    fn preferences_used_until_provider_publishes() {
        let consent = CollectConsent::new();
        assert_eq!(consent.current(&Fixed(None)), ConsentStatus::Pending);

        consent.update(&json!({"consents": {"collect": {"val": "n"}}}));
        assert_eq!(consent.current(&Fixed(None)), ConsentStatus::No);
    }
}
