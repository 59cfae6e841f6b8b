//! I. Ordering, single flight and request shape.

use super::harness::{experience_event, MockResponse, TestHarness};
use crate::{Device, DeviceType, ScreenOrientation};
use std::sync::Arc;
use tokio::sync::Notify;

#[tokio::test]
async fn events_are_sent_in_submission_order() {
    let harness = TestHarness::started();
    let events: Vec<_> = (0..5).map(experience_event).collect();
    for event in &events {
        assert!(harness.edge.send_event(event.clone()).unwrap());
    }

    assert!(harness.wait_for_requests(5).await);
    assert!(harness.wait_for_empty_queue().await);

    let sent: Vec<String> = harness.transport.requests().iter().map(|r| r.event_id()).collect();
    let expected: Vec<String> = events.iter().map(|e| e.id.to_string()).collect();
    assert_eq!(sent, expected);
}

#[tokio::test]
async fn at_most_one_request_in_flight() {
    let harness = TestHarness::started();
    for i in 0..6 {
        harness.edge.send_event(experience_event(i)).unwrap();
    }

    assert!(harness.wait_for_requests(6).await);
    assert_eq!(harness.transport.max_in_flight(), 1);
}

#[tokio::test]
async fn next_hit_waits_for_the_current_one() {
    let harness = TestHarness::started();
    let release = Arc::new(Notify::new());
    harness.transport.queue_response(MockResponse::Hold(release.clone()));

    harness.edge.send_event(experience_event(0)).unwrap();
    harness.edge.send_event(experience_event(1)).unwrap();

    assert!(harness.wait_for_requests(1).await);
    harness.settle().await;
    assert_eq!(harness.transport.request_count(), 1);
    assert_eq!(harness.edge.queued_count().unwrap(), 2);

    release.notify_one();
    assert!(harness.wait_for_requests(2).await);
    assert!(harness.wait_for_empty_queue().await);
}

#[tokio::test]
async fn request_targets_interact_with_ids() {
    let harness = TestHarness::started();
    harness.edge.send_event(experience_event(0)).unwrap();
    assert!(harness.wait_for_requests(1).await);

    let request = &harness.transport.requests()[0];
    let url = &request.request.url;
    assert_eq!(url.host_str(), Some("edge.adobedc.net"));
    assert_eq!(url.path(), "/ee/v1/interact");
    assert_eq!(request.request.query_param("configId").as_deref(), Some("cfg-test"));
    assert!(uuid::Uuid::parse_str(&request.request_id()).is_ok());

    let payload = request.payload();
    assert_eq!(payload["xdm"]["identityMap"]["ECID"][0]["id"], "ecid-test");
    assert_eq!(payload["events"][0]["xdm"]["eventType"], "test.event");
    assert_eq!(payload["meta"]["konductorConfig"]["streaming"]["enabled"], true);
    assert!(payload["xdm"].get("device").is_none());
}

#[tokio::test]
async fn device_details_are_read_at_send_time() {
    let harness = TestHarness::new();
    harness.edge.send_event(experience_event(0)).unwrap();
    harness.shared.set_device(Device {
        model: Some("test-device-name".to_string()),
        screen_width: Some(100),
        screen_height: Some(200),
        screen_orientation: Some(ScreenOrientation::Landscape),
        device_type: Some(DeviceType::Tablet),
        ..Device::default()
    });
    harness.edge.start();

    assert!(harness.wait_for_requests(1).await);
    let device = &harness.transport.requests()[0].payload()["xdm"]["device"];
    assert_eq!(device["model"], "test-device-name");
    assert_eq!(device["screenWidth"], 100);
    assert_eq!(device["screenHeight"], 200);
    assert_eq!(device["screenOrientation"], "landscape");
    assert_eq!(device["type"], "tablet");
    assert!(device.get("manufacturer").is_none());
}

#[tokio::test]
async fn custom_domain_from_configuration() {
    let harness = TestHarness::started();
    harness.shared.set_configuration(Some(serde_json::json!({
        "edge.configId": "cfg-test",
        "edge.domain": "collect.example.com",
        "global.privacy": "optedin"
    })));
    harness.edge.handle_configuration_change();

    harness.edge.send_event(experience_event(0)).unwrap();
    assert!(harness.wait_for_requests(1).await);
    assert_eq!(
        harness.transport.requests()[0].request.url.host_str(),
        Some("collect.example.com")
    );
}

#[tokio::test]
async fn events_without_data_are_ignored() {
    let harness = TestHarness::started();
    let empty = crate::Event::experience(serde_json::Map::new());
    assert!(!harness.edge.send_event(empty).unwrap());
    assert_eq!(harness.edge.queued_count().unwrap(), 0);
}
