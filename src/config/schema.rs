//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::{ConfigError, ConfigResult};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Serial acquisition configuration
    pub serial: SerialConfig,
    /// Log buffer configuration
    pub buffer: BufferConfig,
    /// Hard-reset configuration
    pub reboot: RebootConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values the running service cannot work with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.buffer.capacity == 0 {
            return Err(ConfigError::validation(
                "buffer.capacity",
                "must be at least 1",
            ));
        }
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::validation(
                "serial.baud_rate",
                "must be greater than 0",
            ));
        }
        if self.serial.preferred_port.trim().is_empty() {
            return Err(ConfigError::validation(
                "serial.preferred_port",
                "must not be empty",
            ));
        }
        for pattern in &self.serial.candidate_patterns {
            regex::Regex::new(pattern)
                .map_err(|e| ConfigError::validation("serial.candidate_patterns", e.to_string()))?;
        }
        Ok(())
    }
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port number for HTTP server
    pub port: u16,
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Serial acquisition section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Path tried first on every (re)connect
    pub preferred_port: String,
    /// Baud rate of the device console
    pub baud_rate: u32,
    /// Regexes a scanned device path must match to be probed
    pub candidate_patterns: Vec<String>,
    /// Read timeout used for probe opens and the live handle
    pub probe_timeout_ms: u64,
    /// Idle delay between worker iterations
    pub poll_interval_ms: u64,
    /// Backoff after "no port found" or a failed open
    pub retry_delay_ms: u64,
    /// Backoff after an I/O error, long enough to outlast USB re-enumeration
    pub reconnect_delay_ms: u64,
    /// Settling time after the control lines are released on connect
    pub stabilize_ms: u64,
    /// Largest single read from the device
    pub read_chunk: usize,
    /// Repeated failure messages are logged at most once per window
    pub failure_log_window_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            preferred_port: default_preferred_port().to_string(),
            baud_rate: 115_200,
            candidate_patterns: default_candidate_patterns(),
            probe_timeout_ms: 100,
            poll_interval_ms: 10,
            retry_delay_ms: 1000,
            reconnect_delay_ms: 2000,
            stabilize_ms: 1000,
            read_chunk: 4096,
            failure_log_window_ms: 5000,
        }
    }
}

impl SerialConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn stabilize(&self) -> Duration {
        Duration::from_millis(self.stabilize_ms)
    }

    pub fn failure_log_window(&self) -> Duration {
        Duration::from_millis(self.failure_log_window_ms)
    }
}

#[cfg(target_os = "macos")]
fn default_preferred_port() -> &'static str {
    "/dev/cu.usbmodem101"
}

#[cfg(target_os = "windows")]
fn default_preferred_port() -> &'static str {
    "COM3"
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn default_preferred_port() -> &'static str {
    "/dev/ttyUSB0"
}

/// USB-serial naming conventions of the host platform.
pub fn default_candidate_patterns() -> Vec<String> {
    let patterns: &[&str] = if cfg!(target_os = "windows") {
        &[r"^COM\d+$"]
    } else if cfg!(target_os = "macos") {
        &["usbmodem", "usbserial"]
    } else {
        &["ttyUSB", "ttyACM", "usbmodem", "usbserial"]
    };
    patterns.iter().map(|p| p.to_string()).collect()
}

/// Log buffer section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Number of most recent lines retained
    pub capacity: usize,
    /// Store lines that are empty after stripping the terminator
    pub keep_empty_lines: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: crate::log_store::DEFAULT_CAPACITY,
            keep_empty_lines: true,
        }
    }
}

/// Hard-reset section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RebootConfig {
    /// Line written to the device before the electrical reset; `None` skips it
    pub software_command: Option<String>,
    /// Hold time of each control-line step
    pub pulse_ms: u64,
}

impl Default for RebootConfig {
    fn default() -> Self {
        Self {
            software_command: Some("REBOOT".to_string()),
            pulse_ms: 100,
        }
    }
}

impl RebootConfig {
    pub fn pulse(&self) -> Duration {
        Duration::from_millis(self.pulse_ms)
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}
