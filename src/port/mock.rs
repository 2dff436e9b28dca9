//! Mock serial devices for testing.
//!
//! `MockSerialPort` simulates a device without hardware: queued reads,
//! recorded writes and control-line transitions, and injectable failures.
//! Clones share state, so a test can keep one handle while the connection
//! manager owns another. `MockPortRegistry` plays the role of the host's
//! device list for the port resolver.

use super::error::PortError;
use super::traits::{PortConfiguration, PortProvider, SerialPortAdapter};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Serial control line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlLine {
    Dtr,
    Rts,
}

/// Inner state of the mock port.
#[derive(Debug, Default)]
struct MockPortState {
    /// Queue of bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Log of all bytes written to the port.
    write_log: Vec<Vec<u8>>,
    /// Every control-line change, in order.
    control_log: Vec<(ControlLine, bool)>,
    flush_count: usize,
    /// The next read (or `bytes_to_read`) fails once.
    fail_next_read: bool,
    /// Writes fail until cleared.
    fail_writes: bool,
    /// Every operation fails, as after the cable is pulled.
    unplugged: bool,
}

/// Mock serial port implementation for testing.
///
/// # Example
/// ```
/// use serial_web_console::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.enqueue_read(b"boot ok\n");
///
/// let mut buffer = [0u8; 16];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"boot ok\n");
///
/// port.write_bytes(b"REBOOT\n").unwrap();
/// assert_eq!(port.get_write_log(), vec![b"REBOOT\n".to_vec()]);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    name: String,
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState::default())),
        }
    }

    /// Enqueue bytes to be returned by subsequent read operations.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Get a copy of all data written to the port.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Get every DTR/RTS change made so far.
    pub fn control_log(&self) -> Vec<(ControlLine, bool)> {
        self.state.lock().control_log.clone()
    }

    pub fn clear_control_log(&self) {
        self.state.lock().control_log.clear();
    }

    /// Number of `flush` calls.
    pub fn flush_count(&self) -> usize {
        self.state.lock().flush_count
    }

    /// Make the next read fail with a broken-pipe I/O error.
    pub fn fail_next_read(&self) {
        self.state.lock().fail_next_read = true;
    }

    /// Make writes fail until called again with `false`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Simulate the device disappearing: every operation fails from now on.
    pub fn unplug(&self) {
        self.state.lock().unplugged = true;
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }

    fn broken_pipe() -> PortError {
        PortError::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "device disconnected",
        ))
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        if state.unplugged || state.fail_writes {
            return Err(Self::broken_pipe());
        }
        state.write_log.push(data.to_vec());
        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        if state.unplugged {
            return Err(Self::broken_pipe());
        }
        if state.fail_next_read {
            state.fail_next_read = false;
            return Err(Self::broken_pipe());
        }

        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            match state.read_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        if bytes_read == 0 {
            Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "No data available",
            )))
        } else {
            Ok(bytes_read)
        }
    }

    fn flush(&mut self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        if state.unplugged {
            return Err(Self::broken_pipe());
        }
        state.flush_count += 1;
        Ok(())
    }

    fn bytes_to_read(&mut self) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        if state.unplugged {
            return Err(Self::broken_pipe());
        }
        if state.fail_next_read {
            state.fail_next_read = false;
            return Err(Self::broken_pipe());
        }
        Ok(state.read_queue.len())
    }

    fn set_dtr(&mut self, level: bool) -> Result<(), PortError> {
        let mut state = self.state.lock();
        if state.unplugged {
            return Err(Self::broken_pipe());
        }
        state.control_log.push((ControlLine::Dtr, level));
        Ok(())
    }

    fn set_rts(&mut self, level: bool) -> Result<(), PortError> {
        let mut state = self.state.lock();
        if state.unplugged {
            return Err(Self::broken_pipe());
        }
        state.control_log.push((ControlLine::Rts, level));
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Attached devices in enumeration order.
    devices: Vec<MockSerialPort>,
    busy: HashSet<String>,
    /// Every successful or failed open attempt, in order.
    open_attempts: Vec<String>,
    /// When set, every open fails with a configuration error.
    reject_config: Option<String>,
}

/// A fake host device list implementing `PortProvider`.
#[derive(Debug, Default, Clone)]
pub struct MockPortRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl MockPortRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a device; returns a handle sharing state with whatever gets opened.
    pub fn attach(&self, path: &str) -> MockSerialPort {
        let port = MockSerialPort::new(path);
        let mut state = self.state.lock();
        state.devices.retain(|d| d.name() != path);
        state.devices.push(port.clone());
        port
    }

    /// Remove a device from the host.
    pub fn detach(&self, path: &str) {
        self.state.lock().devices.retain(|d| d.name() != path);
    }

    /// Mark a device as held by another process.
    pub fn set_busy(&self, path: &str, busy: bool) {
        let mut state = self.state.lock();
        if busy {
            state.busy.insert(path.to_string());
        } else {
            state.busy.remove(path);
        }
    }

    /// Make every open fail with a non-recoverable configuration error.
    pub fn reject_config(&self, message: impl Into<String>) {
        self.state.lock().reject_config = Some(message.into());
    }

    pub fn open_attempts(&self) -> Vec<String> {
        self.state.lock().open_attempts.clone()
    }
}

impl PortProvider for MockPortRegistry {
    fn open(
        &self,
        path: &str,
        _config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        let mut state = self.state.lock();
        state.open_attempts.push(path.to_string());

        if let Some(message) = &state.reject_config {
            return Err(PortError::config(message.clone()));
        }
        let device = state
            .devices
            .iter()
            .find(|d| d.name() == path)
            .cloned()
            .ok_or_else(|| PortError::not_found(path))?;
        if state.busy.contains(path) {
            return Err(PortError::open_failed(path, "Device or resource busy"));
        }
        Ok(Box::new(device))
    }

    fn available_ports(&self) -> Result<Vec<String>, PortError> {
        let state = self.state.lock();
        Ok(state.devices.iter().map(|d| d.name().to_string()).collect())
    }
}
