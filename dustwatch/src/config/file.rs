//! Configuration file handling for ~/.dustwatch/config.ini.
//!
//! Loads and saves the service configuration with sensible defaults.
//! Settings structs live in [`super::settings`], constants in
//! [`super::defaults`]; the INI key mapping in both directions is here.

use ini::Ini;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::settings::ConfigFile;

/// Configuration errors. All are fatal at startup, never during a run.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write the config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create the config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.dustwatch/config.ini).
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path();
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// A missing file yields defaults; an existing file is parsed on top of
    /// the defaults and validated.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        let config = parse_ini(&ini)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default path (~/.dustwatch/config.ini).
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = config_file_path();
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::DirectoryError)?;
        }

        let content = to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigError::WriteError(e.to_string()))
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigError> {
        let path = config_file_path();
        if !path.exists() {
            let config = Self::default();
            config.save_to(&path)?;
        }
        Ok(path)
    }
}

/// Get the path to the config directory (~/.dustwatch).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".dustwatch")
}

/// Get the path to the config file (~/.dustwatch/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the
/// INI. This is the single place where INI key names map to struct fields.
fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigError> {
    let mut config = ConfigFile::default();

    // [device] section
    if let Some(section) = ini.section(Some("device")) {
        if let Some(v) = section.get("port") {
            let v = v.trim();
            if !v.is_empty() {
                config.device.port = v.to_string();
            }
        }
        if let Some(v) = section.get("timeout") {
            config.device.timeout_secs = parse_secs("device", "timeout", v)?;
        }
    }

    // [cycle] section
    if let Some(section) = ini.section(Some("cycle")) {
        if let Some(v) = section.get("read_period") {
            config.cycle.read_period_secs = parse_secs("cycle", "read_period", v)?;
        }
        if let Some(v) = section.get("sleep_period") {
            config.cycle.sleep_period_secs = parse_secs("cycle", "sleep_period", v)?;
        }
        if let Some(v) = section.get("sample_interval") {
            config.cycle.sample_interval_secs = parse_secs("cycle", "sample_interval", v)?;
        }
        if let Some(v) = section.get("wake_retry") {
            config.cycle.wake_retry_secs = parse_secs("cycle", "wake_retry", v)?;
        }
        if let Some(v) = section.get("wake_failure_limit") {
            config.cycle.wake_failure_limit =
                v.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        section: "cycle".to_string(),
                        key: "wake_failure_limit".to_string(),
                        value: v.to_string(),
                        reason: "expected a whole number".to_string(),
                    })?;
        }
        if let Some(v) = section.get("offline_retry") {
            config.cycle.offline_retry_secs = parse_secs("cycle", "offline_retry", v)?;
        }
    }

    // [output] section
    if let Some(section) = ini.section(Some("output")) {
        if let Some(v) = section.get("json_output") {
            let v = v.trim();
            if !v.is_empty() {
                config.output.json_output = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("log_raw") {
            config.output.log_raw = parse_bool("output", "log_raw", v)?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

fn parse_secs(section: &str, key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected a whole number of seconds".to_string(),
        })
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

/// Expand a leading ~ to the home directory.
fn expand_tilde(value: &str) -> PathBuf {
    if let Some(stripped) = value.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(value)
}

/// Convert a `ConfigFile` to a commented INI string for saving.
fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[device]
; Serial port the SDS011 sensor is attached to
port = {}
; Seconds to wait for a reply frame before giving up on a sample
timeout = {}

[cycle]
; Seconds the sensor fan stays on collecting samples each cycle
read_period = {}
; Seconds the sensor fan stays off between reading periods
; Duty-cycling stretches the fan/laser rated lifetime considerably
sleep_period = {}
; Seconds between sample attempts during a reading period
sample_interval = {}
; Seconds between wake retries after a command failure
wake_retry = {}
; Consecutive wake failures before the sensor is considered offline
wake_failure_limit = {}
; Seconds between wake retries once the sensor is considered offline
offline_retry = {}

[output]
; Path of the JSON snapshot written after each reading period
; Written atomically: readers never see a partial file
json_output = {}
; Log every accepted sample and read failure (verbose)
log_raw = {}

[logging]
; Log file path
file = {}
"#,
        config.device.port,
        config.device.timeout_secs,
        config.cycle.read_period_secs,
        config.cycle.sleep_period_secs,
        config.cycle.sample_interval_secs,
        config.cycle.wake_retry_secs,
        config.cycle.wake_failure_limit,
        config.cycle.offline_retry_secs,
        path_to_string(&config.output.json_output),
        config.output.log_raw,
        path_to_string(&config.logging.file),
    )
}

/// Convert path to string, collapsing home dir to ~.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
