//! VI. Collect consent and consent updates.

use super::harness::{consent_event, experience_event, SharedState, TestHarness};
use crate::ConsentStatus;
use serde_json::json;

#[tokio::test]
async fn consent_no_drops_at_submission() {
    let harness = TestHarness::started();
    let status = harness
        .edge
        .handle_consent_preferences(&json!({"consents": {"collect": {"val": "n"}}}));
    assert_eq!(status, ConsentStatus::No);

    assert!(!harness.edge.send_event(experience_event(0)).unwrap());
    assert_eq!(harness.edge.queued_count().unwrap(), 0);
}

#[tokio::test]
async fn consent_yes_and_pending_queue() {
    let harness = TestHarness::started();
    harness
        .edge
        .handle_consent_preferences(&json!({"consents": {"collect": {"val": "y"}}}));
    assert!(harness.edge.send_event(experience_event(0)).unwrap());

    harness
        .edge
        .handle_consent_preferences(&json!({"consents": {"collect": {"val": "p"}}}));
    assert!(harness.edge.send_event(experience_event(1)).unwrap());

    assert!(harness.wait_for_requests(2).await);
}

#[tokio::test]
async fn unparseable_consent_is_pending_and_queued() {
    let shared = SharedState::ready();
    shared.set_consent(Some(json!({"consents": "garbage"})));
    let harness = TestHarness::with_shared(shared);
    harness.edge.start();

    assert!(harness.edge.send_event(experience_event(0)).unwrap());
    assert!(harness.wait_for_requests(1).await);
}

#[tokio::test]
async fn provider_consent_no_drops() {
    let shared = SharedState::ready();
    shared.set_consent(Some(json!({"consents": {"collect": {"val": "n"}}})));
    let harness = TestHarness::with_shared(shared);

    assert!(!harness.edge.send_event(experience_event(0)).unwrap());
}

#[tokio::test]
async fn provider_no_after_preference_yes_drops() {
    let harness = TestHarness::started();
    harness
        .edge
        .handle_consent_preferences(&json!({"consents": {"collect": {"val": "y"}}}));
    harness
        .shared
        .set_consent(Some(json!({"consents": {"collect": {"val": "n"}}})));

    assert!(!harness.edge.send_event(experience_event(0)).unwrap());
    assert_eq!(harness.edge.queued_count().unwrap(), 0);
}

#[tokio::test]
async fn invalid_provider_document_after_preference_no_queues() {
    let harness = TestHarness::started();
    harness
        .edge
        .handle_consent_preferences(&json!({"consents": {"collect": {"val": "n"}}}));
    harness.shared.set_consent(Some(json!({"consents": "garbage"})));

    assert!(harness.edge.send_event(experience_event(0)).unwrap());
    assert!(harness.wait_for_requests(1).await);
}

#[tokio::test]
async fn change_to_no_keeps_already_queued_hits() {
    let shared = SharedState::ready();
    shared.set_configuration(Some(json!({"edge.configId": "cfg-test"})));
    let harness = TestHarness::with_shared(shared);
    harness.edge.start();

    harness.edge.send_event(experience_event(0)).unwrap();
    harness
        .edge
        .handle_consent_preferences(&json!({"consents": {"collect": {"val": "n"}}}));
    assert_eq!(harness.edge.queued_count().unwrap(), 1);
}

#[tokio::test]
async fn consent_update_targets_set_consent() {
    let harness = TestHarness::started();
    assert!(harness.edge.update_consent(consent_event("y")).unwrap());
    assert!(harness.wait_for_requests(1).await);

    let request = &harness.transport.requests()[0];
    assert_eq!(request.request.url.path(), "/ee/v1/privacy/set-consent");
    let payload = request.payload();
    assert_eq!(payload["consent"][0]["standard"], "Adobe");
    assert_eq!(payload["consent"][0]["version"], "2.0");
    assert_eq!(payload["consent"][0]["value"]["collect"]["val"], "y");
    assert_eq!(payload["identityMap"]["ECID"][0]["id"], "ecid-test");
}

#[tokio::test]
async fn consent_update_without_data_is_ignored() {
    let harness = TestHarness::started();
    let empty = crate::Event::consent_update(serde_json::Map::new());
    assert!(!harness.edge.update_consent(empty).unwrap());
    assert_eq!(harness.edge.queued_count().unwrap(), 0);
}
