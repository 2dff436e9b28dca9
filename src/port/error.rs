//! Port-specific error types.
//!
//! Serial-layer failures never reach the HTTP surface. They are caught by the
//! connection manager and turned into state transitions, so the main question
//! this type answers is whether retrying can ever help.

use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// No usable device was found at the path, or no candidate matched.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// The device exists but could not be opened (busy, permissions).
    #[error("Failed to open serial port '{path}': {reason}")]
    OpenFailed { path: String, reason: String },

    /// An I/O error occurred mid-session.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The port settings are rejected by the driver. Retrying will not help.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create an OpenFailed error for a path.
    pub fn open_failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::OpenFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether the reconnect loop should keep trying after this error.
    ///
    /// Only a rejected configuration is permanent; a missing, busy or
    /// vanished device may come back after re-enumeration.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }

    /// Whether this is a "nothing to read right now" condition rather than a failure.
    pub fn is_would_block(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}
