//! HTTP-level tests for sync, status and reboot.

use assert_json_diff::{assert_json_eq, assert_json_include};
use serde_json::{json, Value};

use crate::common::TestHarness;

async fn get_json(url: String) -> (reqwest::StatusCode, Value) {
    let response = reqwest::get(url).await.expect("request failed");
    let status = response.status();
    let body = response.json().await.expect("body was not JSON");
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let harness = TestHarness::new();
    let base = harness.start_server().await;

    let body = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_sync_on_empty_store() {
    let harness = TestHarness::new();
    let base = harness.start_server().await;

    let (status, body) = get_json(format!("{base}/api/sync?last_id=0")).await;
    assert!(status.is_success());
    assert_json_eq!(
        body,
        json!({
            "connected": false,
            "last_id": 0,
            "logs": [],
            "status": "Disconnected",
            "count": 0,
            "reset": false
        })
    );
}

#[tokio::test]
async fn test_sync_returns_records_after_cursor() {
    let harness = TestHarness::new();
    harness.store.append("first", "10:00:00");
    harness.store.append("second", "10:00:01");
    harness.store.append("third", "10:00:02");
    let base = harness.start_server().await;

    let (_, all) = get_json(format!("{base}/api/sync?last_id=0")).await;
    assert_json_include!(
        actual: all,
        expected: json!({
            "last_id": 3,
            "count": 3,
            "logs": [
                {"id": 1, "text": "first", "time": "10:00:00"},
                {"id": 2, "text": "second", "time": "10:00:01"},
                {"id": 3, "text": "third", "time": "10:00:02"}
            ]
        })
    );

    let (_, tail) = get_json(format!("{base}/api/sync?last_id=2")).await;
    assert_json_include!(
        actual: tail,
        expected: json!({
            "last_id": 3,
            "logs": [{"id": 3, "text": "third"}]
        })
    );
    assert_eq!(tail["logs"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_legacy_sync_alias_matches() {
    let harness = TestHarness::new();
    harness.store.append("line", "t");
    let base = harness.start_server().await;

    let (_, modern) = get_json(format!("{base}/api/sync?last_id=0")).await;
    let (_, legacy) = get_json(format!("{base}/sync?last_id=0")).await;
    assert_json_eq!(modern, legacy);
}

#[tokio::test]
async fn test_sync_cursor_parsing() {
    let harness = TestHarness::new();
    harness.store.append("line", "t");
    let base = harness.start_server().await;

    let (_, missing) = get_json(format!("{base}/api/sync")).await;
    assert_eq!(missing["logs"].as_array().unwrap().len(), 1);

    let (_, negative) = get_json(format!("{base}/api/sync?last_id=-5")).await;
    assert_eq!(negative["logs"].as_array().unwrap().len(), 1);

    let (status, invalid) = get_json(format!("{base}/api/sync?last_id=abc")).await;
    assert!(status.is_success());
    assert_json_include!(
        actual: invalid,
        expected: json!({"connected": false, "last_id": 0, "logs": []})
    );
    assert!(invalid["error"].as_str().unwrap().contains("abc"));
}

#[tokio::test]
async fn test_sync_signals_reset_for_stale_cursor() {
    let harness = TestHarness::new();
    harness.store.append("after restart", "t");
    let base = harness.start_server().await;

    let (_, body) = get_json(format!("{base}/api/sync?last_id=500")).await;
    assert_json_include!(
        actual: body,
        expected: json!({"last_id": 1, "logs": [], "reset": true})
    );
}

#[tokio::test]
async fn test_status_endpoint() {
    let harness = TestHarness::new();
    harness.connect_device();
    harness.store.append("a", "t");
    harness.store.append("b", "t");
    let base = harness.start_server().await;

    let (_, body) = get_json(format!("{base}/status")).await;
    assert_json_eq!(
        body,
        json!({"status": "Connected", "count": 2, "last_id": 2, "connected": true})
    );
}

#[tokio::test]
async fn test_reboot_rejected_without_connection() {
    let harness = TestHarness::new();
    harness.store.append("keep", "t");
    let base = harness.start_server().await;

    let response = reqwest::Client::new()
        .post(format!("{base}/reboot"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_json_eq!(
        body,
        json!({"success": false, "message": "No serial connection"})
    );
    assert_eq!(harness.store.len(), 1);
}

#[tokio::test]
async fn test_reboot_accepted_and_store_cleared() {
    let harness = TestHarness::new();
    harness.connect_device();
    harness.store.append("before reset", "t");
    let base = harness.start_server().await;

    let response = reqwest::Client::new()
        .post(format!("{base}/reboot"))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_json_include!(actual: body, expected: json!({"success": true}));

    assert!(harness.store.is_empty());
    let (_, sync) = get_json(format!("{base}/api/sync?last_id=1")).await;
    assert_json_include!(
        actual: sync,
        expected: json!({"last_id": 1, "logs": [], "count": 0, "reset": false})
    );
}
