//! Tests against a real attached board.

use serial_web_console::{
    config::SerialConfig, ConnectionManager, EmptyLinePolicy, LogStore, PortProvider,
    PortResolver, SerialPortAdapter, SyncSerialPort, SystemPorts,
};
use std::sync::Arc;
use std::time::Duration;

use super::utils::{candidate_patterns, discover_usb_ports};
use crate::common::wait_until;
use crate::require_test_port;

#[test]
#[ignore]
fn test_open_and_release_control_lines() {
    let config = require_test_port!();

    let mut port = SyncSerialPort::open(&config.port_name, &config.to_port_config())
        .expect("failed to open test port");
    port.set_dtr(false).unwrap();
    port.set_rts(false).unwrap();
    assert!(port.bytes_to_read().is_ok());
}

#[test]
#[ignore]
fn test_system_ports_lists_test_port() {
    let config = require_test_port!();

    let listed = SystemPorts.available_ports().unwrap();
    println!("attached: {listed:?}, usb: {:?}", discover_usb_ports());
    assert!(listed.contains(&config.port_name));
}

#[test]
#[ignore]
fn test_resolver_finds_device_when_preferred_is_wrong() {
    let config = require_test_port!();

    let resolver = PortResolver::new(
        Arc::new(SystemPorts),
        "/dev/definitely-not-a-device",
        candidate_patterns(),
        config.to_port_config(),
    )
    .unwrap();
    let found = resolver.resolve();
    println!("resolved to {found:?}");
    assert!(found.is_some());
}

#[tokio::test]
#[ignore]
async fn test_worker_connects_and_ingests() {
    let config = require_test_port!();

    let store = Arc::new(LogStore::new(1000));
    let settings = SerialConfig {
        preferred_port: config.port_name.clone(),
        baud_rate: config.baud_rate,
        stabilize_ms: 0,
        ..SerialConfig::default()
    };
    let manager = ConnectionManager::new(
        Arc::new(SystemPorts),
        Arc::clone(&store),
        &settings,
        EmptyLinePolicy::Keep,
    )
    .unwrap();

    let (stop, rx) = tokio::sync::watch::channel(false);
    let worker = manager.spawn(rx);

    assert!(wait_until(Duration::from_secs(5), || store.is_connected()).await);
    // Boards that print continuously will have produced something by now.
    wait_until(Duration::from_secs(3), || !store.is_empty()).await;
    println!("ingested {} lines", store.len());

    stop.send(true).unwrap();
    worker.await.unwrap();
    assert!(!store.is_connected());
}
