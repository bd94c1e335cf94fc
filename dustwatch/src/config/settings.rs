//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file. These are
//! pure data types; parsing and serialization live in [`super::file`],
//! defaults in [`super::defaults`].

use std::path::PathBuf;

use super::file::ConfigError;

/// Complete service configuration loaded from config.ini.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// Serial device settings
    pub device: DeviceSettings,
    /// Duty-cycle timing and retry settings
    pub cycle: CycleSettings,
    /// Snapshot output settings
    pub output: OutputSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Serial device configuration.
#[derive(Debug, Clone)]
pub struct DeviceSettings {
    /// Serial port path the SDS011 is attached to
    pub port: String,
    /// Seconds to wait for a reply frame before giving up on a sample
    pub timeout_secs: u64,
}

/// Duty-cycle configuration.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    /// Seconds the fan stays on collecting samples each cycle
    pub read_period_secs: u64,
    /// Seconds the fan stays off between reading periods
    pub sleep_period_secs: u64,
    /// Seconds between sample attempts during a reading period
    pub sample_interval_secs: u64,
    /// Seconds between wake retries after a command failure
    pub wake_retry_secs: u64,
    /// Consecutive wake failures before the sensor is considered offline
    pub wake_failure_limit: u32,
    /// Seconds between wake retries once the sensor is considered offline
    pub offline_retry_secs: u64,
}

/// Snapshot output configuration.
#[derive(Debug, Clone)]
pub struct OutputSettings {
    /// Path of the JSON snapshot written after each reading period
    pub json_output: PathBuf,
    /// Log every accepted sample and read failure (verbose)
    pub log_raw: bool,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}

impl ConfigFile {
    /// Validate the startup-fatal rules.
    ///
    /// Invalid values fail startup with a [`ConfigError`] rather than
    /// starting the acquisition loop in a broken state.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.port.trim().is_empty() {
            return Err(invalid(
                "device",
                "port",
                &self.device.port,
                "must not be empty",
            ));
        }
        require_positive("device", "timeout", self.device.timeout_secs)?;
        require_positive("cycle", "read_period", self.cycle.read_period_secs)?;
        require_positive("cycle", "sample_interval", self.cycle.sample_interval_secs)?;
        if self.cycle.sample_interval_secs > self.cycle.read_period_secs {
            return Err(invalid(
                "cycle",
                "sample_interval",
                &self.cycle.sample_interval_secs.to_string(),
                "must not exceed read_period",
            ));
        }
        require_positive("cycle", "wake_retry", self.cycle.wake_retry_secs)?;
        require_positive("cycle", "offline_retry", self.cycle.offline_retry_secs)?;
        if self.cycle.wake_failure_limit == 0 {
            return Err(invalid(
                "cycle",
                "wake_failure_limit",
                "0",
                "must be at least 1",
            ));
        }
        if self.output.json_output.as_os_str().is_empty() {
            return Err(invalid("output", "json_output", "", "must not be empty"));
        }
        if self.logging.file.as_os_str().is_empty() {
            return Err(invalid("logging", "file", "", "must not be empty"));
        }
        Ok(())
    }
}

fn require_positive(section: &str, key: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(invalid(
            section,
            key,
            "0",
            "must be a positive number of seconds",
        ));
    }
    Ok(())
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
