//! Shared test utilities for the serial web console tests.
//!
//! This module provides common test infrastructure including:
//! - A harness wiring a mock device registry to the real worker and router
//! - An in-process HTTP server bound to an ephemeral port
//! - Polling helpers for asynchronous assertions

#![allow(dead_code)]

use serial_web_console::{
    build_router,
    config::{RebootConfig, SerialConfig},
    ConnectionManager, EmptyLinePolicy, LogStore, MockPortRegistry, MockSerialPort,
    RebootController, RestContext, SyncService,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Device path the harness prefers.
pub const TEST_DEVICE: &str = "/dev/ttyACM0";

/// Serial settings with all delays collapsed so tests run fast.
pub fn fast_serial_config() -> SerialConfig {
    SerialConfig {
        preferred_port: TEST_DEVICE.to_string(),
        candidate_patterns: vec!["ttyACM".to_string(), "usbmodem".to_string()],
        poll_interval_ms: 1,
        retry_delay_ms: 5,
        reconnect_delay_ms: 5,
        stabilize_ms: 0,
        ..SerialConfig::default()
    }
}

/// Complete test environment: mock devices, worker, store and HTTP context.
pub struct TestHarness {
    pub registry: MockPortRegistry,
    pub store: Arc<LogStore>,
    pub manager: ConnectionManager,
    pub ctx: RestContext,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let registry = MockPortRegistry::new();
        let store = Arc::new(LogStore::new(capacity));
        let manager = ConnectionManager::new(
            Arc::new(registry.clone()),
            Arc::clone(&store),
            &fast_serial_config(),
            EmptyLinePolicy::Keep,
        )
        .expect("Failed to build connection manager");
        let reboot_config = RebootConfig {
            pulse_ms: 1,
            ..RebootConfig::default()
        };
        let ctx = RestContext {
            sync: SyncService::new(Arc::clone(&store)),
            reboot: RebootController::new(manager.handle(), Arc::clone(&store), &reboot_config),
        };

        Self {
            registry,
            store,
            manager,
            ctx,
        }
    }

    /// Attach the preferred device and connect to it synchronously.
    pub fn connect_device(&self) -> MockSerialPort {
        let device = self.registry.attach(TEST_DEVICE);
        self.manager.step();
        assert!(self.store.is_connected(), "harness failed to connect");
        device
    }

    /// Start the background worker; send `true` on the returned sender to stop it.
    pub fn spawn_worker(&self) -> (watch::Sender<bool>, JoinHandle<()>) {
        let (tx, rx) = watch::channel(false);
        let worker = self.manager.clone().spawn(rx);
        (tx, worker)
    }

    /// Serve the router on an ephemeral port and return its base URL.
    pub async fn start_server(&self) -> String {
        let app = build_router(self.ctx.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get address");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server failed");
        });

        format!("http://127.0.0.1:{}", addr.port())
    }
}

/// Poll `check` until it returns true or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

/// Await `fut`, failing the test if it takes longer than `timeout`.
pub async fn within<T>(timeout: Duration, fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(timeout, fut)
        .await
        .expect("operation timed out")
}
