//! Default values and constants for all configuration settings.

use super::file::config_directory;
use super::settings::*;

/// Default serial port for USB-attached SDS011 adapters.
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Default per-read device timeout in seconds.
pub const DEFAULT_DEVICE_TIMEOUT_SECS: u64 = 3;

/// Default reading period in seconds (fan on).
pub const DEFAULT_READ_PERIOD_SECS: u64 = 60;

/// Default sleep period in seconds (fan off).
pub const DEFAULT_SLEEP_PERIOD_SECS: u64 = 60;

/// Default pause between sample attempts in seconds.
pub const DEFAULT_SAMPLE_INTERVAL_SECS: u64 = 2;

/// Default pause after a failed wake before retrying, in seconds.
pub const DEFAULT_WAKE_RETRY_SECS: u64 = 3;

/// Default number of consecutive wake failures before the sensor is
/// considered offline and retries slow down.
pub const DEFAULT_WAKE_FAILURE_LIMIT: u32 = 5;

/// Default retry interval once the sensor is considered offline, in seconds.
pub const DEFAULT_OFFLINE_RETRY_SECS: u64 = 10;

/// Default snapshot file name (under the config directory).
pub const DEFAULT_JSON_OUTPUT_FILE: &str = "particles.json";

/// Default log file name (under the config directory).
pub const DEFAULT_LOG_FILE: &str = "dustwatch.log";

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            device: DeviceSettings::default(),
            cycle: CycleSettings::default(),
            output: OutputSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            timeout_secs: DEFAULT_DEVICE_TIMEOUT_SECS,
        }
    }
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            read_period_secs: DEFAULT_READ_PERIOD_SECS,
            sleep_period_secs: DEFAULT_SLEEP_PERIOD_SECS,
            sample_interval_secs: DEFAULT_SAMPLE_INTERVAL_SECS,
            wake_retry_secs: DEFAULT_WAKE_RETRY_SECS,
            wake_failure_limit: DEFAULT_WAKE_FAILURE_LIMIT,
            offline_retry_secs: DEFAULT_OFFLINE_RETRY_SECS,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            json_output: config_directory().join(DEFAULT_JSON_OUTPUT_FILE),
            log_raw: false,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: config_directory().join(DEFAULT_LOG_FILE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values_match_constants() {
        let config = ConfigFile::default();
        assert_eq!(config.device.port, "/dev/ttyUSB0");
        assert_eq!(config.device.timeout_secs, 3);
        assert_eq!(config.cycle.read_period_secs, 60);
        assert_eq!(config.cycle.sleep_period_secs, 60);
        assert_eq!(config.cycle.sample_interval_secs, 2);
        assert_eq!(config.cycle.wake_failure_limit, 5);
        assert!(!config.output.log_raw);
    }

    #[test]
    fn test_default_paths_live_under_config_directory() {
        let config = ConfigFile::default();
        assert!(config.output.json_output.ends_with("particles.json"));
        assert!(config.logging.file.ends_with("dustwatch.log"));
    }
}
