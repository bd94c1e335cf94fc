//! Process-lifecycle facade for the sensor service.
//!
//! Wires the shared cache, the serial opener, the snapshot exporter, and the
//! duty-cycle controller together from a validated [`ConfigFile`]. The
//! service owns the controller thread: [`SensorService::stop`] returns only
//! after the thread has exited and released the serial device.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{ConfigError, ConfigFile};
use crate::host::HostAdapter;
use crate::sensor::{ControllerConfig, DutyCycleController, Sds011Opener, SharedReading};
use crate::snapshot::SnapshotExporter;

/// Running sensor service.
///
/// Dropping the service also stops the controller; [`stop`] just makes the
/// join explicit.
///
/// [`stop`]: SensorService::stop
pub struct SensorService {
    controller: DutyCycleController,
    readings: SharedReading,
}

impl SensorService {
    /// Validate `config` and start the acquisition loop.
    ///
    /// The only failure mode is configuration validation; an absent or
    /// unresponsive device is handled by the controller's retry path, not
    /// reported here.
    pub fn start(config: &ConfigFile) -> Result<Self, ConfigError> {
        config.validate()?;

        let readings = SharedReading::new();
        let opener = Sds011Opener::new(
            config.device.port.as_str(),
            Duration::from_secs(config.device.timeout_secs),
        );
        let exporter = SnapshotExporter::new(&config.output.json_output);
        let controller_config = ControllerConfig {
            read_period: Duration::from_secs(config.cycle.read_period_secs),
            sleep_period: Duration::from_secs(config.cycle.sleep_period_secs),
            sample_interval: Duration::from_secs(config.cycle.sample_interval_secs),
            wake_retry_backoff: Duration::from_secs(config.cycle.wake_retry_secs),
            wake_failure_limit: config.cycle.wake_failure_limit,
            offline_retry_interval: Duration::from_secs(config.cycle.offline_retry_secs),
            log_raw: config.output.log_raw,
            ..ControllerConfig::default()
        };

        info!(
            port = %config.device.port,
            json_output = %config.output.json_output.display(),
            "Starting sensor service"
        );

        let controller = DutyCycleController::start(
            controller_config,
            Box::new(opener),
            readings.clone(),
            exporter,
        );

        Ok(Self {
            controller,
            readings,
        })
    }

    /// Handle to the latest-reading cache. Cheap to clone, safe to hand to
    /// any thread.
    pub fn readings(&self) -> SharedReading {
        self.readings.clone()
    }

    /// Host-integration adapter over this service's readings.
    pub fn host_adapter(&self) -> HostAdapter {
        HostAdapter::new(Arc::new(self.readings.clone()))
    }

    /// Stop the controller and wait for it to release the device.
    pub fn stop(mut self) {
        info!("Stopping sensor service");
        self.controller.shutdown();
        self.controller.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::ReadingProvider;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> ConfigFile {
        let mut config = ConfigFile::default();
        // A port that cannot exist: the controller will retry forever,
        // which is exactly the behavior under test.
        config.device.port = "/nonexistent/ttyUSB99".to_string();
        config.output.json_output = temp_dir.path().join("particles.json");
        config.cycle.wake_retry_secs = 1;
        config
    }

    #[test]
    fn test_start_rejects_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.cycle.read_period_secs = 0;

        assert!(SensorService::start(&config).is_err());
    }

    #[test]
    fn test_start_and_stop_without_device() {
        let temp_dir = TempDir::new().unwrap();
        let service = SensorService::start(&test_config(&temp_dir)).unwrap();

        // No device, so no readings and nothing merged.
        assert!(service.readings().latest().is_none());
        let mut record = serde_json::Map::new();
        assert!(!service.host_adapter().merge_into(&mut record));
        assert!(record.is_empty());

        service.stop();
    }

    #[test]
    fn test_empty_json_output_fails_startup() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.output.json_output = PathBuf::new();

        assert!(SensorService::start(&config).is_err());
    }
}
