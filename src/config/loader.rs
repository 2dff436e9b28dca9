//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "SERIAL_CONSOLE";

/// Config file name
const CONFIG_FILE_NAME: &str = "serial-console.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "SERIAL_CONSOLE_CONFIG";

/// Short alias for the preferred serial path.
const LEGACY_PORT_ENV: &str = "SERIAL_PORT";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `SERIAL_CONSOLE_CONFIG` environment variable (explicit path)
    /// 2. `./serial-console.toml` (current directory)
    /// 3. the platform config directory (`~/.config/serial-web-console/` on Linux)
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables override file values; the result is validated.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        // Still apply env overrides even with defaults
        if apply_env_overrides(&mut config).is_err() || config.validate().is_err() {
            config = Config::default();
        }

        Self {
            config_path: None,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. Platform config directory
    if let Some(app_config) = get_default_config_path() {
        if app_config.exists() {
            return Some(app_config);
        }
    }

    None
}

/// Get the platform-specific config directory for this application.
pub fn get_default_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "serial-web-console")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the default config file path.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

fn env_var(key: &str) -> Option<(String, String)> {
    let name = format!("{ENV_PREFIX}_{key}");
    std::env::var(&name).ok().map(|val| (name, val))
}

fn parse_env<T: FromStr>(name: &str, val: &str, what: &str) -> ConfigResult<T> {
    val.trim()
        .parse()
        .map_err(|_| ConfigError::env_parse(name, format!("Invalid {what}: '{val}'")))
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `SERIAL_CONSOLE_<SECTION>_<KEY>`
/// For example:
/// - `SERIAL_CONSOLE_SERVER_PORT=8080`
/// - `SERIAL_CONSOLE_SERIAL_PREFERRED_PORT=/dev/ttyACM0`
/// - `SERIAL_CONSOLE_BUFFER_CAPACITY=500`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Server overrides
    if let Some((_, val)) = env_var("SERVER_HOST") {
        config.server.host = val;
    }
    if let Some((name, val)) = env_var("SERVER_PORT") {
        config.server.port = parse_env(&name, &val, "port number")?;
    }
    if let Some((_, val)) = env_var("SERVER_LOG_LEVEL") {
        config.server.log_level = val;
    }

    // Serial overrides (the short SERIAL_PORT is accepted too)
    if let Some((_, val)) =
        env_var("SERIAL_PREFERRED_PORT").or_else(|| {
            std::env::var(LEGACY_PORT_ENV)
                .ok()
                .map(|v| (LEGACY_PORT_ENV.to_string(), v))
        })
    {
        config.serial.preferred_port = val;
    }
    if let Some((name, val)) = env_var("SERIAL_BAUD_RATE") {
        config.serial.baud_rate = parse_env(&name, &val, "baud rate")?;
    }

    // Buffer overrides
    if let Some((name, val)) = env_var("BUFFER_CAPACITY") {
        config.buffer.capacity = parse_env(&name, &val, "capacity")?;
    }
    if let Some((_, val)) = env_var("BUFFER_KEEP_EMPTY_LINES") {
        config.buffer.keep_empty_lines = val.eq_ignore_ascii_case("true") || val == "1";
    }

    // Reboot overrides; an empty value disables the software command
    if let Some((_, val)) = env_var("REBOOT_SOFTWARE_COMMAND") {
        config.reboot.software_command = if val.is_empty() { None } else { Some(val) };
    }

    // Logging overrides
    if let Some((name, val)) = env_var("LOGGING_FORMAT") {
        config.logging.format = val
            .parse()
            .map_err(|e: String| ConfigError::env_parse(name, e))?;
    }

    Ok(())
}
