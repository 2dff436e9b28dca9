//! Worker-level workflows: ingest, disconnect, re-enumeration and reset.

use serial_web_console::port::ControlLine;
use serial_web_console::ConnectionState;
use std::time::Duration;

use crate::common::{wait_until, within, TestHarness, TEST_DEVICE};

const WAIT: Duration = Duration::from_secs(5);

fn texts(harness: &TestHarness) -> Vec<String> {
    harness
        .store
        .snapshot_since(0)
        .into_iter()
        .map(|r| r.text)
        .collect()
}

#[tokio::test]
async fn test_worker_ingests_lines_split_across_reads() {
    let harness = TestHarness::new();
    let device = harness.registry.attach(TEST_DEVICE);
    let (stop, worker) = harness.spawn_worker();

    assert!(wait_until(WAIT, || harness.store.is_connected()).await);
    device.enqueue_read(b"U-Boot 2024.01\r\nCPU: ");
    assert!(wait_until(WAIT, || harness.store.len() == 1).await);
    device.enqueue_read(b"ARMv8\r\n\r\n");
    assert!(wait_until(WAIT, || harness.store.len() == 3).await);

    assert_eq!(texts(&harness), vec!["U-Boot 2024.01", "CPU: ARMv8", ""]);

    stop.send(true).unwrap();
    within(WAIT, worker).await.unwrap();
    assert!(!harness.store.is_connected());
}

#[tokio::test]
async fn test_worker_recovers_after_device_reenumerates() {
    let harness = TestHarness::new();
    let first = harness.registry.attach(TEST_DEVICE);
    let (stop, worker) = harness.spawn_worker();

    assert!(wait_until(WAIT, || harness.store.is_connected()).await);
    first.enqueue_read(b"before\n");
    assert!(wait_until(WAIT, || harness.store.len() == 1).await);

    first.unplug();
    harness.registry.detach(TEST_DEVICE);
    assert!(wait_until(WAIT, || !harness.store.is_connected()).await);

    let second = harness.registry.attach("/dev/ttyACM1");
    assert!(wait_until(WAIT, || harness.store.is_connected()).await);
    assert_eq!(
        harness.manager.handle().path().as_deref(),
        Some("/dev/ttyACM1")
    );
    second.enqueue_read(b"after\n");
    assert!(wait_until(WAIT, || harness.store.len() == 2).await);

    let records = harness.store.snapshot_since(0);
    assert_eq!(records[0].sequence, 1);
    assert_eq!(records[1].sequence, 2);
    assert_eq!(records[1].text, "after");

    stop.send(true).unwrap();
    within(WAIT, worker).await.unwrap();
}

#[tokio::test]
async fn test_partial_line_dropped_on_disconnect() {
    let harness = TestHarness::new();
    let device = harness.registry.attach(TEST_DEVICE);
    let (stop, worker) = harness.spawn_worker();

    assert!(wait_until(WAIT, || harness.store.is_connected()).await);
    device.enqueue_read(b"half a li");
    assert!(wait_until(WAIT, || harness.manager.handle().remainder_len() == 9).await);

    device.fail_next_read();
    assert!(wait_until(WAIT, || harness.manager.handle().remainder_len() == 0).await);
    assert!(wait_until(WAIT, || harness.store.is_connected()).await);

    device.enqueue_read(b"ne\n");
    assert!(wait_until(WAIT, || harness.store.len() == 1).await);
    assert_eq!(texts(&harness), vec!["ne"]);

    stop.send(true).unwrap();
    within(WAIT, worker).await.unwrap();
}

#[tokio::test]
async fn test_reboot_toggles_lines_on_live_worker() {
    let harness = TestHarness::new();
    let device = harness.registry.attach(TEST_DEVICE);
    let (stop, worker) = harness.spawn_worker();

    assert!(wait_until(WAIT, || harness.store.is_connected()).await);
    device.clear_control_log();

    harness.ctx.reboot.trigger().unwrap();
    assert!(wait_until(WAIT, || device.control_log().len() == 6).await);
    assert_eq!(device.get_write_log(), vec![b"REBOOT\n".to_vec()]);
    assert_eq!(
        device.control_log()[..2],
        [(ControlLine::Dtr, false), (ControlLine::Rts, true)]
    );

    stop.send(true).unwrap();
    within(WAIT, worker).await.unwrap();
}

#[tokio::test]
async fn test_worker_stops_on_permanent_failure() {
    let harness = TestHarness::new();
    harness.registry.attach(TEST_DEVICE);
    harness.registry.reject_config("invalid baud rate");
    let (_stop, worker) = harness.spawn_worker();

    within(WAIT, worker).await.unwrap();
    assert_eq!(harness.manager.handle().state(), ConnectionState::Failed);
    assert!(!harness.store.is_connected());
}
