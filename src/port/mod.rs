//! Port abstraction layer for serial communication.
//!
//! Provides the adapter trait for an open device, the provider trait for
//! opening and enumerating devices, a `serialport`-backed implementation of
//! both, and mocks for tests.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::{ControlLine, MockPortRegistry, MockSerialPort};
pub use sync_port::*;
pub use traits::*;
