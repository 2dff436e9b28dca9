//! Remote hard reset over DTR/RTS.
//!
//! `trigger` answers immediately; the reset itself runs on the blocking pool
//! while holding the connection lock, so the worker cannot read in between
//! the control-line steps. A request arriving while a reset is still running
//! is rejected instead of waiting on that lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::RebootConfig;
use crate::connection::ConnectionHandle;
use crate::log_store::LogStore;
use crate::port::{PortError, SerialPortAdapter};

#[derive(Debug, Error)]
pub enum RebootError {
    /// Nothing is attached; the request is rejected and not retried.
    #[error("No serial connection")]
    NoConnection,

    #[error("Reboot already in progress")]
    InProgress,

    #[error("reset sequence failed: {0}")]
    Port(#[from] PortError),
}

#[derive(Debug, Clone)]
pub struct RebootController {
    connection: ConnectionHandle,
    store: Arc<LogStore>,
    software_command: Option<String>,
    pulse: Duration,
    running: Arc<AtomicBool>,
}

/// Clears the running flag when the detached sequence ends.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RebootController {
    pub fn new(connection: ConnectionHandle, store: Arc<LogStore>, config: &RebootConfig) -> Self {
        Self {
            connection,
            store,
            software_command: config.software_command.clone(),
            pulse: config.pulse(),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a reset sequence is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Accept or reject a reset request.
    ///
    /// On acceptance the log store has already been cleared and the reset
    /// sequence is running detached. Must be called within a tokio runtime.
    pub fn trigger(&self) -> Result<(), RebootError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RebootError::InProgress);
        }
        let guard = RunningGuard(Arc::clone(&self.running));

        let path = {
            let inner = self.connection.lock();
            if inner.port.is_none() {
                return Err(RebootError::NoConnection);
            }
            self.store.clear();
            inner.path.clone()
        };
        info!(path = ?path, "reboot requested");

        let controller = self.clone();
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            match controller.run_sequence() {
                Ok(()) => info!("reboot sequence complete"),
                Err(e) => warn!(error = %e, "reboot sequence failed"),
            }
        });
        Ok(())
    }

    /// Send the software command (if any), then pulse the control lines.
    ///
    /// A failed command write aborts before any line is touched. Errors leave
    /// the handle in place for the connection worker to discover.
    pub(crate) fn run_sequence(&self) -> Result<(), RebootError> {
        let mut inner = self.connection.lock();
        let port = inner.port.as_mut().ok_or(RebootError::NoConnection)?;

        if let Some(command) = &self.software_command {
            let line = format!("{command}\n");
            port.write_bytes(line.as_bytes())?;
            port.flush()?;
        }

        pulse_reset(&mut **port, self.pulse)?;
        Ok(())
    }
}

/// DTR low / RTS high, then DTR high / RTS low, then both released.
fn pulse_reset(port: &mut dyn SerialPortAdapter, hold: Duration) -> Result<(), PortError> {
    port.set_dtr(false)?;
    port.set_rts(true)?;
    thread::sleep(hold);

    port.set_dtr(true)?;
    port.set_rts(false)?;
    thread::sleep(hold);

    port.set_dtr(false)?;
    port.set_rts(false)?;
    Ok(())
}
