//! Core traits for serial port abstraction.
//!
//! `SerialPortAdapter` lets real serial ports and mocks be used
//! interchangeably by the connection manager and the reboot controller.
//! `PortProvider` is the seam for opening and enumerating devices, which is
//! what the port resolver depends on.

use super::error::PortError;
use std::time::Duration;

/// Baud rate used by the attached device's UART console.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Configuration parameters for a serial port.
///
/// Data bits, parity and stop bits are fixed at 8N1 with no flow control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfiguration {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Read/write timeout.
    pub timeout: Duration,
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: Duration::from_millis(100),
        }
    }
}

impl PortConfiguration {
    pub fn new(baud_rate: u32, timeout: Duration) -> Self {
        Self { baud_rate, timeout }
    }
}

/// Trait for serial port I/O operations.
///
/// All methods take `&mut self`: a handle is only ever touched while its
/// owner holds the connection lock.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Write bytes to the serial port.
    ///
    /// Returns the number of bytes actually written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read bytes from the serial port into the provided buffer.
    ///
    /// Returns the number of bytes actually read.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Block until all written bytes have been transmitted.
    fn flush(&mut self) -> Result<(), PortError>;

    /// Number of bytes waiting in the receive buffer.
    ///
    /// Errors here usually mean the device has gone away.
    fn bytes_to_read(&mut self) -> Result<usize, PortError>;

    /// Drive the Data Terminal Ready control line.
    fn set_dtr(&mut self, level: bool) -> Result<(), PortError>;

    /// Drive the Request To Send control line.
    fn set_rts(&mut self, level: bool) -> Result<(), PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;
}

/// Opens and enumerates serial devices.
#[cfg_attr(test, mockall::automock)]
pub trait PortProvider: Send + Sync {
    /// Open the device at `path` with the given configuration.
    fn open(
        &self,
        path: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError>;

    /// List the device paths currently attached to the host.
    fn available_ports(&self) -> Result<Vec<String>, PortError>;
}
