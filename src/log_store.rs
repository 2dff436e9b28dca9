//! Bounded, ordered log buffer.
//!
//! The store keeps the most recent `capacity` lines, each tagged with a
//! sequence number assigned at ingestion. Sequence numbers start at 1, grow
//! by exactly one per appended line and are never reused: eviction and
//! `clear` drop records but never roll `last_sequence` back.
//!
//! One writer (the connection worker) appends under the write lock; any
//! number of sync requests read under the read lock, so a reader never sees
//! a buffer mid-eviction.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

/// Default number of lines retained.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Display format of `LogRecord::timestamp`.
pub const TIMESTAMP_FORMAT: &str = "%H:%M:%S";

/// One ingested line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    #[serde(rename = "id")]
    pub sequence: u64,
    pub text: String,
    /// Wall-clock time of ingestion, for display only.
    #[serde(rename = "time")]
    pub timestamp: String,
}

/// Point-in-time summary of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    pub connected: bool,
    pub last_sequence: u64,
    pub count: usize,
}

#[derive(Debug, Default)]
struct Inner {
    records: VecDeque<LogRecord>,
    last_sequence: u64,
}

/// Ring buffer of `LogRecord`s plus the shared "connected" flag.
#[derive(Debug)]
pub struct LogStore {
    capacity: usize,
    inner: RwLock<Inner>,
    connected: AtomicBool,
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LogStore {
    /// Create an empty store. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: RwLock::new(Inner {
                records: VecDeque::with_capacity(capacity),
                last_sequence: 0,
            }),
            connected: AtomicBool::new(false),
        }
    }

    /// Append a line stamped with the current local time.
    pub fn append_now(&self, text: impl Into<String>) -> LogRecord {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.append(text, timestamp)
    }

    /// Assign the next sequence number and push, evicting the oldest record when full.
    pub fn append(&self, text: impl Into<String>, timestamp: impl Into<String>) -> LogRecord {
        let mut inner = self.inner.write();
        inner.last_sequence += 1;
        let record = LogRecord {
            sequence: inner.last_sequence,
            text: text.into(),
            timestamp: timestamp.into(),
        };
        if inner.records.len() == self.capacity {
            inner.records.pop_front();
        }
        inner.records.push_back(record.clone());
        record
    }

    /// All buffered records with `sequence > cursor`, ascending.
    pub fn snapshot_since(&self, cursor: u64) -> Vec<LogRecord> {
        let inner = self.inner.read();
        Self::records_after(&inner, cursor)
    }

    /// `snapshot_since` and `current_status` taken under a single read lock.
    ///
    /// The returned `last_sequence` is never lower than the newest record in
    /// the snapshot, so a client that advances its cursor to it cannot skip lines.
    pub fn snapshot_with_status(&self, cursor: u64) -> (Vec<LogRecord>, StoreStatus) {
        let inner = self.inner.read();
        let records = Self::records_after(&inner, cursor);
        let status = StoreStatus {
            connected: self.is_connected(),
            last_sequence: inner.last_sequence,
            count: inner.records.len(),
        };
        (records, status)
    }

    pub fn current_status(&self) -> StoreStatus {
        let inner = self.inner.read();
        StoreStatus {
            connected: self.is_connected(),
            last_sequence: inner.last_sequence,
            count: inner.records.len(),
        }
    }

    /// Drop every buffered record. `last_sequence` is kept.
    pub fn clear(&self) {
        self.inner.write().records.clear();
    }

    pub fn last_sequence(&self) -> u64 {
        self.inner.read().last_sequence
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Mirror of the connection manager's state, written only by it.
    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    fn records_after(inner: &Inner, cursor: u64) -> Vec<LogRecord> {
        let start = inner.records.partition_point(|r| r.sequence <= cursor);
        inner.records.range(start..).cloned().collect()
    }
}
