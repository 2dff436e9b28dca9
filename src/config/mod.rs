//! Configuration module for the serial web console.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `SERIAL_CONSOLE_CONFIG` environment variable (explicit path)
//! 2. `./serial-console.toml` (current directory)
//! 3. The platform config directory, e.g. `~/.config/serial-web-console/serial-console.toml`
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is `SERIAL_CONSOLE_<SECTION>_<KEY>`:
//! - `SERIAL_CONSOLE_SERVER_PORT=8080`
//! - `SERIAL_CONSOLE_SERIAL_PREFERRED_PORT=/dev/ttyACM0` (or the short `SERIAL_PORT`)
//! - `SERIAL_CONSOLE_BUFFER_CAPACITY=500`
//!
//! # Example
//!
//! ```rust,no_run
//! use serial_web_console::config::ConfigLoader;
//!
//! let config = ConfigLoader::load()?.into_config();
//! println!("Serving on {}", config.server.bind_address());
//! # Ok::<(), serial_web_console::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader};
pub use schema::{
    default_candidate_patterns, BufferConfig, Config, LogFormat, LoggingConfig, RebootConfig,
    SerialConfig, ServerConfig,
};
