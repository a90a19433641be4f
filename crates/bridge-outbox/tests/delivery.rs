//! End-to-end delivery against a mock HTTP receiver.

use bridge_config_and_utils::{Config, Paths};
use bridge_outbox::{Bridge, DeliveryStatus, DrainOutcome, DrainSummary, EventPacket};
use serde_json::json;
use std::path::Path;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> Config {
    Config {
        endpoint_url: format!("{}/receive_telemetry", server.uri()),
        retry_delay_seconds: 0.0,
        request_timeout_seconds: 2.0,
        poll_interval_ms: 10,
        ..Config::default()
    }
}

fn packet(value: serde_json::Value) -> EventPacket {
    value.as_object().unwrap().clone()
}

fn statuses(bridge: &Bridge) -> Vec<DeliveryStatus> {
    bridge
        .audit()
        .read_entries()
        .unwrap()
        .into_iter()
        .map(|e| e.status)
        .collect()
}

#[tokio::test]
async fn fail_fail_succeed_against_http_receiver() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/receive_telemetry"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/receive_telemetry"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let paths = Paths::with_base_dir(dir.path().to_path_buf());
    let bridge = Bridge::open(&config_for(&server), &paths).await.unwrap();

    let id = bridge
        .enqueue(&packet(json!({ "state": "completed" })))
        .await
        .unwrap();
    let head = bridge.peek_oldest().await.unwrap().unwrap();
    assert_eq!((head.id, head.retries), (id, 0));

    let summary = bridge.drain_until_empty().await.unwrap();
    assert_eq!(
        summary,
        DrainSummary {
            delivered: 1,
            retried: 2,
            dropped: 0
        }
    );

    assert_eq!(
        statuses(&bridge),
        vec![
            DeliveryStatus::Retry(1),
            DeliveryStatus::Retry(2),
            DeliveryStatus::Success
        ]
    );
    assert_eq!(bridge.count_pending().await.unwrap(), 0);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn unreachable_sink_drops_after_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let paths = Paths::with_base_dir(dir.path().to_path_buf());
    let config = Config {
        max_retries: 3,
        ..config_for(&server)
    };
    let bridge = Bridge::open(&config, &paths).await.unwrap();
    bridge
        .enqueue(&packet(json!({ "state": "skipped" })))
        .await
        .unwrap();

    let summary = bridge.drain_until_empty().await.unwrap();
    assert_eq!(summary.retried, 3);
    assert_eq!(summary.dropped, 1);
    assert_eq!(
        statuses(&bridge),
        vec![
            DeliveryStatus::Retry(1),
            DeliveryStatus::Retry(2),
            DeliveryStatus::Retry(3),
            DeliveryStatus::FailedMaxRetries
        ]
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn queue_and_retry_counts_survive_restart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let paths = Paths::with_base_dir(dir.path().to_path_buf());
    let config = config_for(&server);

    let (first, second) = {
        let bridge = Bridge::open(&config, &paths).await.unwrap();
        let first = bridge
            .enqueue(&packet(json!({ "n": 1 })))
            .await
            .unwrap();
        let second = bridge
            .enqueue(&packet(json!({ "n": 2 })))
            .await
            .unwrap();
        assert_eq!(
            bridge.drain_one().await.unwrap(),
            DrainOutcome::Retried {
                id: first,
                retries: 1
            }
        );
        (first, second)
    };

    assert!(Path::new(&config.storage_location(&paths)).exists());

    let reopened = Bridge::open(&config, &paths).await.unwrap();
    assert_eq!(reopened.count_pending().await.unwrap(), 2);
    let head = reopened.peek_oldest().await.unwrap().unwrap();
    assert_eq!((head.id, head.retries), (first, 1));

    assert_eq!(
        reopened.drain_one().await.unwrap(),
        DrainOutcome::Delivered { id: first }
    );
    assert_eq!(
        reopened.drain_one().await.unwrap(),
        DrainOutcome::Delivered { id: second }
    );

    let third = reopened
        .enqueue(&packet(json!({ "n": 3 })))
        .await
        .unwrap();
    assert!(third > second);
}
