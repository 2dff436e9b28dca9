//! Serial connection lifecycle.
//!
//! `ConnectionManager` is the single background worker that owns the device
//! handle. Each iteration ([`ConnectionManager::step`]) either tries to
//! acquire a device or drains whatever bytes are waiting, frames them into
//! lines and appends those to the log store. Any I/O error drops the handle
//! and the framer remainder, and the next iteration starts over from
//! discovery.
//!
//! The handle, the state and the framer sit behind one lock
//! ([`ConnectionHandle`]) which the reboot controller shares, so a reset
//! sequence never interleaves with a read.

use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::SerialConfig;
use crate::framer::{EmptyLinePolicy, LineFramer};
use crate::log_store::LogStore;
use crate::port::{PortConfiguration, PortError, PortProvider, SerialPortAdapter};
use crate::resolver::{PortResolver, Resolution};

/// Where the worker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Permanent misconfiguration; the worker has stopped.
    Failed,
}

/// State guarded by the connection lock.
#[derive(Default)]
pub(crate) struct ConnectionInner {
    pub(crate) state: ConnectionState,
    pub(crate) port: Option<Box<dyn SerialPortAdapter>>,
    pub(crate) path: Option<String>,
    pub(crate) framer: LineFramer,
}

impl fmt::Debug for ConnectionInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionInner")
            .field("state", &self.state)
            .field("path", &self.path)
            .field("open", &self.port.is_some())
            .field("remainder", &self.framer.remainder().len())
            .finish()
    }
}

/// Shared view of the connection, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct ConnectionHandle {
    inner: Arc<Mutex<ConnectionInner>>,
}

impl ConnectionHandle {
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    /// Path of the current (or last attempted) device.
    pub fn path(&self) -> Option<String> {
        self.inner.lock().path.clone()
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().port.is_some()
    }

    /// Bytes of an unterminated line carried over to the next read.
    pub fn remainder_len(&self) -> usize {
        self.inner.lock().framer.remainder().len()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ConnectionInner> {
        self.inner.lock()
    }
}

/// Rate limiter for repeated failure messages.
///
/// At most one message per window is let through; the ones held back are
/// counted and the count is handed out with the next permitted message.
#[derive(Debug)]
pub struct FailureThrottle {
    window: Duration,
    last_emit: Option<Instant>,
    suppressed: u32,
}

impl FailureThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_emit: None,
            suppressed: 0,
        }
    }

    /// `Some(suppressed)` when a message may be logged now.
    pub fn permit(&mut self) -> Option<u32> {
        self.permit_at(Instant::now())
    }

    pub fn permit_at(&mut self, now: Instant) -> Option<u32> {
        match self.last_emit {
            Some(last) if now.duration_since(last) < self.window => {
                self.suppressed = self.suppressed.saturating_add(1);
                None
            }
            _ => {
                self.last_emit = Some(now);
                Some(std::mem::take(&mut self.suppressed))
            }
        }
    }

    /// Forget history, so the next failure is logged straight away.
    pub fn reset(&mut self) {
        self.last_emit = None;
        self.suppressed = 0;
    }
}

/// What the worker loop should do after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Sleep this long, then step again.
    Continue(Duration),
    /// The connection failed permanently; stop the loop.
    Stop,
}

/// Owns the serial device and feeds the log store.
#[derive(Clone)]
pub struct ConnectionManager {
    handle: ConnectionHandle,
    store: Arc<LogStore>,
    provider: Arc<dyn PortProvider>,
    resolver: Arc<PortResolver>,
    settings: Arc<SerialConfig>,
    throttle: Arc<Mutex<FailureThrottle>>,
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("handle", &self.handle)
            .field("resolver", &self.resolver)
            .finish()
    }
}

impl ConnectionManager {
    pub fn new(
        provider: Arc<dyn PortProvider>,
        store: Arc<LogStore>,
        settings: &SerialConfig,
        empty_lines: EmptyLinePolicy,
    ) -> Result<Self, PortError> {
        let resolver = PortResolver::from_config(Arc::clone(&provider), settings)?;
        let handle = ConnectionHandle::default();
        handle.lock().framer = LineFramer::new(empty_lines);

        Ok(Self {
            handle,
            store,
            provider,
            resolver: Arc::new(resolver),
            throttle: Arc::new(Mutex::new(FailureThrottle::new(
                settings.failure_log_window(),
            ))),
            settings: Arc::new(settings.clone()),
        })
    }

    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    pub fn store(&self) -> &Arc<LogStore> {
        &self.store
    }

    /// Run one iteration of the state machine.
    ///
    /// Blocking: probes and reads happen on the calling thread.
    pub fn step(&self) -> StepOutcome {
        let state = self.handle.state();
        match state {
            ConnectionState::Failed => StepOutcome::Stop,
            ConnectionState::Connected => self.poll_read(),
            ConnectionState::Disconnected | ConnectionState::Connecting => self.connect(),
        }
    }

    /// Spawn [`run`](Self::run) on the tokio runtime.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Step until `shutdown` flips to `true` (or its sender goes away), or
    /// until the connection fails permanently. The handle is closed on exit.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(preferred = %self.resolver.preferred(), "serial worker started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let worker = self.clone();
            let outcome = match tokio::task::spawn_blocking(move || worker.step()).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(error = %e, "serial worker step panicked");
                    break;
                }
            };
            let delay = match outcome {
                StepOutcome::Continue(delay) => delay,
                StepOutcome::Stop => break,
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.close();
        info!("serial worker stopped");
    }

    /// Release the device, if any. A `Failed` state is kept.
    pub fn close(&self) {
        let mut inner = self.handle.lock();
        if inner.port.take().is_some() {
            info!(path = ?inner.path, "serial port closed");
        }
        inner.framer.reset();
        if inner.state != ConnectionState::Failed {
            inner.state = ConnectionState::Disconnected;
        }
        self.store.set_connected(false);
    }

    fn connect(&self) -> StepOutcome {
        let path = match self.resolver.try_resolve() {
            Ok(Resolution::Found(path)) => path,
            Ok(Resolution::NotFound { candidates }) => {
                if let Some(suppressed) = self.throttle.lock().permit() {
                    warn!(
                        preferred = %self.resolver.preferred(),
                        ?candidates,
                        suppressed,
                        "no serial port found, retrying"
                    );
                }
                return StepOutcome::Continue(self.settings.retry_delay());
            }
            Err(e) => return self.fail(e),
        };

        {
            let mut inner = self.handle.lock();
            inner.state = ConnectionState::Connecting;
            inner.path = Some(path.clone());
        }

        match self.open_configured(&path) {
            Ok(port) => {
                let mut inner = self.handle.lock();
                inner.framer.reset();
                inner.port = Some(port);
                inner.state = ConnectionState::Connected;
                self.store.set_connected(true);
                self.throttle.lock().reset();
                info!(path = %path, baud = self.settings.baud_rate, "serial port connected");
                StepOutcome::Continue(self.settings.stabilize())
            }
            Err(e) if !e.is_recoverable() => self.fail(e),
            Err(e) => {
                self.handle.lock().state = ConnectionState::Disconnected;
                if let Some(suppressed) = self.throttle.lock().permit() {
                    warn!(path = %path, error = %e, suppressed, "failed to open serial port");
                }
                StepOutcome::Continue(self.settings.retry_delay())
            }
        }
    }

    /// Open at the configured baud rate and release DTR/RTS so the device
    /// is not held in reset or its bootloader.
    fn open_configured(&self, path: &str) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        let config = PortConfiguration::new(self.settings.baud_rate, self.settings.probe_timeout());
        let mut port = self.provider.open(path, &config)?;
        port.set_dtr(false)?;
        port.set_rts(false)?;
        Ok(port)
    }

    fn poll_read(&self) -> StepOutcome {
        let mut guard = self.handle.lock();
        let inner = &mut *guard;

        let Some(port) = inner.port.as_mut() else {
            inner.state = ConnectionState::Disconnected;
            self.store.set_connected(false);
            return StepOutcome::Continue(self.settings.poll_interval());
        };

        match read_available(&mut **port, self.settings.read_chunk) {
            Ok(bytes) => {
                if !bytes.is_empty() {
                    let lines = inner.framer.feed(&bytes);
                    debug!(bytes = bytes.len(), lines = lines.len(), "serial chunk");
                    for line in lines {
                        self.store.append_now(line);
                    }
                }
                StepOutcome::Continue(self.settings.poll_interval())
            }
            Err(e) => {
                warn!(path = ?inner.path, error = %e, "serial I/O error, reconnecting");
                inner.port = None;
                inner.framer.reset();
                inner.state = ConnectionState::Disconnected;
                self.store.set_connected(false);
                StepOutcome::Continue(self.settings.reconnect_delay())
            }
        }
    }

    fn fail(&self, e: PortError) -> StepOutcome {
        error!(error = %e, "serial configuration rejected, worker stopping");
        let mut inner = self.handle.lock();
        inner.port = None;
        inner.framer.reset();
        inner.state = ConnectionState::Failed;
        self.store.set_connected(false);
        StepOutcome::Stop
    }
}

/// Read whatever is waiting, up to `max` bytes. Never blocks on an idle line.
fn read_available(port: &mut dyn SerialPortAdapter, max: usize) -> Result<Vec<u8>, PortError> {
    let waiting = port.bytes_to_read()?;
    if waiting == 0 {
        return Ok(Vec::new());
    }
    let mut buffer = vec![0u8; waiting.min(max.max(1))];
    match port.read_bytes(&mut buffer) {
        Ok(n) => {
            buffer.truncate(n);
            Ok(buffer)
        }
        Err(e) if e.is_would_block() => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}
