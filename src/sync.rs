//! Incremental client sync.
//!
//! Browsers poll with the last sequence number they have seen and receive
//! only newer lines. Delivery is at-least-once and idempotent by `id`: the
//! returned `last_id` is the store's last sequence at call time, so a client
//! that always adopts it never asks twice for the same line.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::log_store::{LogRecord, LogStore, StoreStatus};

/// Response body of `GET /api/sync`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SyncResponse {
    pub connected: bool,
    pub last_id: u64,
    pub logs: Vec<LogRecord>,
    pub status: &'static str,
    pub count: usize,
    /// The submitted cursor is ahead of `last_id`, which only happens after a
    /// restart reset the numbering. The client should restart from zero.
    pub reset: bool,
}

/// Response body of `GET /status`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: &'static str,
    pub count: usize,
    pub last_id: u64,
    pub connected: bool,
}

/// Display label for the connection badge.
pub fn status_label(connected: bool) -> &'static str {
    if connected {
        "Connected"
    } else {
        "Disconnected"
    }
}

/// Answers polling requests from the log store.
#[derive(Debug, Clone)]
pub struct SyncService {
    store: Arc<LogStore>,
}

impl SyncService {
    pub fn new(store: Arc<LogStore>) -> Self {
        Self { store }
    }

    /// Records newer than `last_id`, plus the cursor to use next time.
    pub fn sync(&self, last_id: u64) -> SyncResponse {
        let (logs, StoreStatus { connected, last_sequence, count }) =
            self.store.snapshot_with_status(last_id);
        let reset = last_sequence < last_id;
        if reset {
            debug!(
                cursor = last_id,
                last_sequence,
                "client cursor ahead of store; signalling reset"
            );
        }
        SyncResponse {
            connected,
            last_id: last_sequence,
            logs,
            status: status_label(connected),
            count,
            reset,
        }
    }

    pub fn status(&self) -> StatusResponse {
        let StoreStatus {
            connected,
            last_sequence,
            count,
        } = self.store.current_status();
        StatusResponse {
            status: status_label(connected),
            count,
            last_id: last_sequence,
            connected,
        }
    }

    pub fn store(&self) -> &Arc<LogStore> {
        &self.store
    }
}
