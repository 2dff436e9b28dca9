//! Serial Web Console Library
//!
//! Bridges a device's UART console to browsers: a background worker reads
//! newline-delimited text from a serial port, a bounded log store keeps the
//! most recent lines with sequence numbers, and a small HTTP API lets clients
//! poll for new lines and trigger a DTR/RTS hard reset.
//!
//! # Modules
//!
//! - `config`: Configuration management with TOML support
//! - `port`: Port abstraction layer for serial communication
//! - `resolver`: Serial device discovery
//! - `connection`: Connection lifecycle worker
//! - `framer`: Byte stream to line framing
//! - `log_store`: Bounded, sequence-numbered log buffer
//! - `sync`: Incremental client sync
//! - `reboot`: Hard reset over control lines
//! - `rest_api`: HTTP router and handlers
//! - `error`: Unified error handling

pub mod config;
pub mod connection;
pub mod error;
pub mod framer;
pub mod log_store;
pub mod port;
pub mod reboot;
pub mod resolver;
pub mod rest_api;
pub mod sync;

// Re-export commonly used types for convenience
pub use connection::{ConnectionHandle, ConnectionManager, ConnectionState, StepOutcome};
pub use error::{AppError, AppResult};
pub use framer::{EmptyLinePolicy, LineFramer};
pub use log_store::{LogRecord, LogStore, StoreStatus};
pub use port::{
    MockPortRegistry, MockSerialPort, PortConfiguration, PortError, PortProvider,
    SerialPortAdapter, SyncSerialPort, SystemPorts,
};
pub use reboot::{RebootController, RebootError};
pub use resolver::PortResolver;
pub use rest_api::{build_router, RestContext};
pub use sync::{StatusResponse, SyncResponse, SyncService};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
