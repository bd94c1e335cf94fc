//! Duty-cycle controller: the background thread that owns the sensor.
//!
//! The controller runs a three-state machine on a dedicated thread:
//!
//! ```text
//! Waking --[wake acknowledged]--> Sampling
//! Waking --[wake failed]--> Waking (retry after backoff; degraded
//!                                   interval after repeated failures)
//! Sampling --[read period elapsed]--> Sleeping (snapshot exported)
//! Sampling --[device lost]--> Waking
//! Sleeping --[sleep period elapsed]--> Waking
//! ```
//!
//! The fan only spins during Waking/Sampling, which is what stretches the
//! sensor's rated lifetime. Failures never escape this thread: transient
//! read errors skip a sample and keep the last published reading, command
//! and open failures loop through Waking's retry path indefinitely.
//!
//! Shutdown is signalled through an `AtomicBool` and observed by every wait
//! and device call boundary, so `join` returns promptly from any state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::cache::{ReadingProvider, SharedReading};
use super::clock::{Clock, SystemClock};
use super::driver::{DeviceOpener, DriverError, SensorDevice};
use super::reading::Reading;
use super::state::CycleState;
use crate::snapshot::SnapshotExporter;

/// Timing and retry policy for the duty cycle.
///
/// Loaded once at startup; there is no live reconfiguration.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// How long the fan stays on collecting samples each cycle.
    pub read_period: Duration,

    /// How long the fan stays off between reading periods.
    pub sleep_period: Duration,

    /// Pause between sample attempts during a reading period.
    pub sample_interval: Duration,

    /// Pause after a failed wake before retrying.
    pub wake_retry_backoff: Duration,

    /// Consecutive wake failures before the sensor is considered offline.
    pub wake_failure_limit: u32,

    /// Retry interval once the sensor is considered offline.
    pub offline_retry_interval: Duration,

    /// Settling time between a successful wake and the first query.
    pub warmup: Duration,

    /// Log every accepted sample and read failure at elevated levels.
    pub log_raw: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            read_period: Duration::from_secs(60),
            sleep_period: Duration::from_secs(60),
            sample_interval: Duration::from_secs(2),
            wake_retry_backoff: Duration::from_secs(3),
            wake_failure_limit: 5,
            offline_retry_interval: Duration::from_secs(10),
            warmup: Duration::from_secs(1),
            log_raw: false,
        }
    }
}

/// Handle to the running duty-cycle thread.
///
/// The controller is the only code that touches the serial device. It can be
/// cleanly shut down by calling [`shutdown`] then [`join`], or by dropping
/// the handle.
///
/// [`shutdown`]: DutyCycleController::shutdown
/// [`join`]: DutyCycleController::join
pub struct DutyCycleController {
    thread_handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl DutyCycleController {
    /// Start the duty cycle on its own thread.
    ///
    /// The device is opened lazily inside the thread, so a missing device at
    /// startup is handled by the same retry path as a mid-run unplug.
    pub fn start(
        config: ControllerConfig,
        opener: Box<dyn DeviceOpener>,
        readings: SharedReading,
        exporter: SnapshotExporter,
    ) -> Self {
        Self::start_with_clock(config, opener, readings, exporter, Arc::new(SystemClock))
    }

    /// Start with an explicit clock (virtual time in tests).
    pub fn start_with_clock(
        config: ControllerConfig,
        opener: Box<dyn DeviceOpener>,
        readings: SharedReading,
        exporter: SnapshotExporter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker = CycleWorker {
            config,
            opener,
            device: None,
            readings,
            exporter,
            clock,
            shutdown: shutdown.clone(),
            wake_failures: 0,
        };

        let thread_handle = thread::Builder::new()
            .name("sds011-cycle".to_string())
            .spawn(move || worker.run())
            .expect("Failed to spawn duty-cycle thread");

        Self {
            thread_handle: Some(thread_handle),
            shutdown,
        }
    }

    /// Signal the controller to stop.
    ///
    /// Non-blocking; the thread finishes its in-flight device call first.
    /// Call [`join`](DutyCycleController::join) to wait for it.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Wait for the controller thread to finish and release the device.
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                warn!("Duty-cycle thread panicked: {:?}", e);
            }
        }
    }

    /// Whether the controller thread is still alive.
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for DutyCycleController {
    fn drop(&mut self) {
        self.shutdown();
        self.join();
    }
}

/// What became of one sample attempt.
enum SampleOutcome {
    /// A validated reading was published to the cache.
    Published,
    /// Transient failure or implausible values; cache untouched.
    Skipped,
    /// The device stopped responding to commands; reopen via Waking.
    DeviceLost,
}

/// The state machine itself. Lives entirely on the controller thread.
struct CycleWorker {
    config: ControllerConfig,
    opener: Box<dyn DeviceOpener>,
    device: Option<Box<dyn SensorDevice>>,
    readings: SharedReading,
    exporter: SnapshotExporter,
    clock: Arc<dyn Clock>,
    shutdown: Arc<AtomicBool>,
    wake_failures: u32,
}

impl CycleWorker {
    fn run(mut self) {
        info!(
            read_period_secs = self.config.read_period.as_secs(),
            sleep_period_secs = self.config.sleep_period.as_secs(),
            sample_interval_secs = self.config.sample_interval.as_secs(),
            "Duty-cycle controller started"
        );

        let mut state = CycleState::Waking;
        while !self.shutdown_requested() {
            state = match state {
                CycleState::Waking => self.run_waking(),
                CycleState::Sampling => self.run_sampling(),
                CycleState::Sleeping => self.run_sleeping(),
            };
        }

        // Best effort: stop the fan before letting go of the port.
        if let Some(device) = self.device.as_mut() {
            if let Err(e) = device.sleep() {
                debug!(error = %e, "Sleep command during shutdown failed");
            }
        }
        self.release_device();
        info!("Duty-cycle controller stopped");
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Interruptible wait; `false` means shutdown was signalled.
    fn wait(&self, duration: Duration) -> bool {
        self.clock.wait(duration, &self.shutdown)
    }

    /// Waking: open the device if needed and turn the fan on.
    ///
    /// Loops here until the sensor responds. Repeated failures degrade to
    /// the slower offline retry interval; this state never gives up.
    fn run_waking(&mut self) -> CycleState {
        debug!("Entering Waking");
        while !self.shutdown_requested() {
            match self.try_wake() {
                Ok(()) => {
                    if self.wake_failures > 0 {
                        info!(
                            failures = self.wake_failures,
                            "Sensor responding again after failed wakes"
                        );
                    }
                    self.wake_failures = 0;
                    // Let the fan establish airflow before the first query.
                    self.wait(self.config.warmup);
                    return CycleState::Sampling;
                }
                Err(e) => {
                    self.wake_failures = self.wake_failures.saturating_add(1);
                    self.release_device();
                    warn!(error = %e, failures = self.wake_failures, "Failed to wake sensor");

                    let backoff = if self.wake_failures >= self.config.wake_failure_limit {
                        if self.wake_failures == self.config.wake_failure_limit {
                            warn!(
                                failures = self.wake_failures,
                                retry_secs = self.config.offline_retry_interval.as_secs(),
                                "Sensor appears offline, slowing retries"
                            );
                        }
                        self.config.offline_retry_interval
                    } else {
                        self.config.wake_retry_backoff
                    };

                    if !self.wait(backoff) {
                        break;
                    }
                }
            }
        }
        CycleState::Waking
    }

    fn try_wake(&mut self) -> Result<(), DriverError> {
        if self.device.is_none() {
            let device = self.opener.open()?;
            debug!("Serial device opened");
            self.device = Some(device);
        }
        let device = self.device.as_mut().expect("device opened above");
        device.wake()
    }

    /// Sampling: poll the sensor until the read period elapses, publishing
    /// every validated reading. Ends by exporting a snapshot of the latest
    /// reading, then hands over to Sleeping.
    fn run_sampling(&mut self) -> CycleState {
        info!(
            read_period_secs = self.config.read_period.as_secs(),
            "Entering Sampling, fan on"
        );

        let deadline = self.clock.now() + self.config.read_period;
        let mut accepted = 0u32;
        while !self.shutdown_requested() && self.clock.now() < deadline {
            match self.read_one() {
                SampleOutcome::Published => accepted += 1,
                SampleOutcome::Skipped => {}
                SampleOutcome::DeviceLost => return CycleState::Waking,
            }
            if !self.wait(self.config.sample_interval) {
                break;
            }
        }

        if self.shutdown_requested() {
            // Period cut short; leave without exporting.
            return CycleState::Sampling;
        }

        info!(accepted, "Sampling period complete");
        self.export_snapshot();
        CycleState::Sleeping
    }

    /// One sample attempt against the open device.
    fn read_one(&mut self) -> SampleOutcome {
        let device = match self.device.as_mut() {
            Some(device) => device,
            None => return SampleOutcome::DeviceLost,
        };

        match device.read_sample() {
            Ok(sample) => {
                if self.config.log_raw {
                    debug!(
                        pm2_5 = sample.pm2_5,
                        pm10_0 = sample.pm10_0,
                        "Sample received"
                    );
                }
                match Reading::from_sample(&sample, self.clock.epoch_secs()) {
                    Some(reading) => {
                        self.readings.publish(reading);
                        SampleOutcome::Published
                    }
                    None => {
                        warn!(
                            pm2_5 = sample.pm2_5,
                            pm10_0 = sample.pm10_0,
                            "Discarding out-of-range sample"
                        );
                        SampleOutcome::Skipped
                    }
                }
            }
            Err(e @ (DriverError::Timeout | DriverError::Frame(_))) => {
                // Transient: skip this sample, keep the last good reading.
                if self.config.log_raw {
                    warn!(error = %e, "Sample read failed, keeping last reading");
                } else {
                    debug!(error = %e, "Sample read failed, keeping last reading");
                }
                SampleOutcome::Skipped
            }
            Err(e) => {
                warn!(error = %e, "Device failure during sampling, will reopen");
                self.release_device();
                SampleOutcome::DeviceLost
            }
        }
    }

    fn export_snapshot(&self) {
        match self.readings.latest() {
            Some(reading) => {
                if let Err(e) = self.exporter.export(&reading) {
                    warn!(
                        error = %e,
                        path = %self.exporter.path().display(),
                        "Snapshot export failed, will retry next cycle"
                    );
                }
            }
            None => debug!("No reading published yet, skipping snapshot export"),
        }
    }

    /// Sleeping: fan off, cache untouched, wait out the sleep period.
    fn run_sleeping(&mut self) -> CycleState {
        info!(
            sleep_period_secs = self.config.sleep_period.as_secs(),
            "Entering Sleeping, fan off"
        );
        if let Some(device) = self.device.as_mut() {
            if let Err(e) = device.sleep() {
                warn!(error = %e, "Failed to put sensor to sleep");
            }
        }
        self.wait(self.config.sleep_period);
        CycleState::Waking
    }

    fn release_device(&mut self) {
        if let Some(mut device) = self.device.take() {
            device.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::clock::ManualClock;
    use crate::sensor::protocol::Sample;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Shared script and call counters for the mock device/opener pair.
    struct MockState {
        reads: Mutex<VecDeque<Result<Sample, DriverError>>>,
        open_calls: AtomicU32,
        wake_calls: AtomicU32,
        sleep_calls: AtomicU32,
        close_calls: AtomicU32,
        reads_served: AtomicU32,
        /// Raise this flag once the given number of reads has been served.
        stop_after_reads: Option<(u32, Arc<AtomicBool>)>,
    }

    impl MockState {
        fn new(script: Vec<Result<Sample, DriverError>>) -> Arc<Self> {
            Self::with_stop(script, None)
        }

        fn with_stop(
            script: Vec<Result<Sample, DriverError>>,
            stop_after_reads: Option<(u32, Arc<AtomicBool>)>,
        ) -> Arc<Self> {
            Arc::new(Self {
                reads: Mutex::new(script.into()),
                open_calls: AtomicU32::new(0),
                wake_calls: AtomicU32::new(0),
                sleep_calls: AtomicU32::new(0),
                close_calls: AtomicU32::new(0),
                reads_served: AtomicU32::new(0),
                stop_after_reads,
            })
        }
    }

    struct MockDevice {
        state: Arc<MockState>,
    }

    impl SensorDevice for MockDevice {
        fn wake(&mut self) -> Result<(), DriverError> {
            self.state.wake_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn sleep(&mut self) -> Result<(), DriverError> {
            self.state.sleep_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn read_sample(&mut self) -> Result<Sample, DriverError> {
            let served = self.state.reads_served.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((limit, flag)) = &self.state.stop_after_reads {
                if served >= *limit {
                    flag.store(true, Ordering::Relaxed);
                }
            }
            self.state
                .reads
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(DriverError::Timeout))
        }

        fn close(&mut self) {
            self.state.close_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct MockOpener {
        state: Arc<MockState>,
    }

    impl DeviceOpener for MockOpener {
        fn open(&self) -> Result<Box<dyn SensorDevice>, DriverError> {
            self.state.open_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockDevice {
                state: self.state.clone(),
            }))
        }
    }

    /// Opener that never succeeds; raises the shutdown flag after a given
    /// number of attempts so synchronous tests terminate.
    struct FailingOpener {
        attempts: Arc<AtomicU32>,
        stop_after: u32,
        shutdown: Arc<AtomicBool>,
    }

    impl DeviceOpener for FailingOpener {
        fn open(&self) -> Result<Box<dyn SensorDevice>, DriverError> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.stop_after {
                self.shutdown.store(true, Ordering::Relaxed);
            }
            Err(DriverError::DeviceUnavailable {
                port: "/dev/ttyUSB9".to_string(),
                source: serialport::Error::new(serialport::ErrorKind::NoDevice, "mock"),
            })
        }
    }

    fn sample(pm2_5: f64) -> Sample {
        Sample {
            pm2_5,
            pm10_0: pm2_5 * 2.0,
        }
    }

    struct Harness {
        worker: CycleWorker,
        state: Arc<MockState>,
        readings: SharedReading,
        clock: Arc<ManualClock>,
        snapshot_path: std::path::PathBuf,
        _temp_dir: TempDir,
    }

    /// Build a worker over a scripted device with virtual time.
    fn harness(script: Vec<Result<Sample, DriverError>>, config: ControllerConfig) -> Harness {
        let temp_dir = TempDir::new().unwrap();
        let snapshot_path = temp_dir.path().join("particles.json");
        let state = MockState::new(script);
        let readings = SharedReading::new();
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker = CycleWorker {
            config,
            opener: Box::new(MockOpener {
                state: state.clone(),
            }),
            device: None,
            readings: readings.clone(),
            exporter: SnapshotExporter::new(&snapshot_path),
            clock: clock.clone(),
            shutdown: shutdown.clone(),
            wake_failures: 0,
        };

        Harness {
            worker,
            state,
            readings,
            clock,
            snapshot_path,
            _temp_dir: temp_dir,
        }
    }

    #[test]
    fn test_default_config() {
        let config = ControllerConfig::default();
        assert_eq!(config.read_period, Duration::from_secs(60));
        assert_eq!(config.sleep_period, Duration::from_secs(60));
        assert_eq!(config.sample_interval, Duration::from_secs(2));
        assert_eq!(config.wake_failure_limit, 5);
        assert!(!config.log_raw);
    }

    #[test]
    fn test_each_success_replaces_cached_reading() {
        let script = vec![
            Ok(sample(1.0)),
            Ok(sample(2.0)),
            Err(DriverError::Timeout),
            Ok(sample(3.0)),
        ];
        let mut h = harness(script, ControllerConfig::default());
        assert!(matches!(h.worker.run_waking(), CycleState::Sampling));

        assert!(matches!(h.worker.read_one(), SampleOutcome::Published));
        assert_eq!(h.readings.latest().unwrap().pm2_5, 1.0);

        assert!(matches!(h.worker.read_one(), SampleOutcome::Published));
        assert_eq!(h.readings.latest().unwrap().pm2_5, 2.0);

        // A timeout must not disturb the cached reading.
        assert!(matches!(h.worker.read_one(), SampleOutcome::Skipped));
        assert_eq!(h.readings.latest().unwrap().pm2_5, 2.0);

        assert!(matches!(h.worker.read_one(), SampleOutcome::Published));
        assert_eq!(h.readings.latest().unwrap().pm2_5, 3.0);
    }

    #[test]
    fn test_frame_error_keeps_last_reading() {
        let script = vec![
            Ok(sample(7.5)),
            Err(DriverError::Frame(
                crate::sensor::protocol::FrameError::BadHeader(0x55),
            )),
        ];
        let mut h = harness(script, ControllerConfig::default());
        h.worker.run_waking();

        h.worker.read_one();
        assert!(matches!(h.worker.read_one(), SampleOutcome::Skipped));
        assert_eq!(h.readings.latest().unwrap().pm2_5, 7.5);
    }

    #[test]
    fn test_out_of_range_sample_never_published() {
        let script = vec![Ok(sample(-0.1))];
        let mut h = harness(script, ControllerConfig::default());
        h.worker.run_waking();

        assert!(matches!(h.worker.read_one(), SampleOutcome::Skipped));
        assert!(h.readings.latest().is_none());
    }

    #[test]
    fn test_full_cycle_with_failures_at_the_tail() {
        // One reading period: 5 valid samples, then nothing but timeouts.
        let script = (1..=5).map(|i| Ok(sample(i as f64))).collect();
        let mut h = harness(script, ControllerConfig::default());

        assert!(matches!(h.worker.run_waking(), CycleState::Sampling));
        assert_eq!(h.state.wake_calls.load(Ordering::SeqCst), 1);

        assert!(matches!(h.worker.run_sampling(), CycleState::Sleeping));

        // 60s period / 2s interval = 30 attempts: 5 published, 25 timeouts.
        assert_eq!(h.state.reads_served.load(Ordering::SeqCst), 30);
        let latest = h.readings.latest().unwrap();
        assert_eq!(latest.pm2_5, 5.0);
        assert_eq!(latest.pm10_0, 10.0);

        // The exported snapshot reflects the fifth sample.
        let exported: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&h.snapshot_path).unwrap()).unwrap();
        assert_eq!(exported["pm2_5"], 5.0);
        assert_eq!(exported["pm10_0"], 10.0);
        assert_eq!(exported["dateTime"], latest.timestamp);

        // Sleeping leaves the cache untouched for the whole sleep period.
        let before_sleep = h.clock.elapsed();
        assert!(matches!(h.worker.run_sleeping(), CycleState::Waking));
        assert_eq!(h.clock.elapsed() - before_sleep, Duration::from_secs(60));
        assert_eq!(h.readings.latest().unwrap(), latest);
        assert_eq!(h.state.sleep_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_samples_means_no_export() {
        let mut h = harness(Vec::new(), ControllerConfig::default());

        h.worker.run_waking();
        assert!(matches!(h.worker.run_sampling(), CycleState::Sleeping));

        assert!(h.readings.latest().is_none());
        assert!(!h.snapshot_path.exists());
    }

    #[test]
    fn test_repeated_open_failures_degrade_but_never_give_up() {
        let attempts = Arc::new(AtomicU32::new(0));
        let shutdown = Arc::new(AtomicBool::new(false));
        let clock = Arc::new(ManualClock::new(0));
        let temp_dir = TempDir::new().unwrap();

        let mut worker = CycleWorker {
            config: ControllerConfig::default(),
            opener: Box::new(FailingOpener {
                attempts: attempts.clone(),
                stop_after: 10,
                shutdown: shutdown.clone(),
            }),
            device: None,
            readings: SharedReading::new(),
            exporter: SnapshotExporter::new(temp_dir.path().join("particles.json")),
            clock: clock.clone(),
            shutdown: shutdown.clone(),
            wake_failures: 0,
        };

        // Ten consecutive open failures end the phase only because the
        // opener raises shutdown; the state machine itself never bails.
        assert!(matches!(worker.run_waking(), CycleState::Waking));
        assert_eq!(attempts.load(Ordering::SeqCst), 10);

        // Four retries at the short backoff (3s), then degraded 10s waits.
        let expected = Duration::from_secs(4 * 3 + 5 * 10);
        assert_eq!(clock.elapsed(), expected);
    }

    #[test]
    fn test_device_loss_during_sampling_returns_to_waking() {
        let script = vec![
            Ok(sample(4.0)),
            Err(DriverError::Command("serial read failed".to_string())),
        ];
        let mut h = harness(script, ControllerConfig::default());

        h.worker.run_waking();
        assert!(matches!(h.worker.run_sampling(), CycleState::Waking));

        // Handle dropped so Waking reopens; the reading survives.
        assert_eq!(h.state.close_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.readings.latest().unwrap().pm2_5, 4.0);
    }

    #[test]
    fn test_shutdown_stops_fan_and_releases_device() {
        let temp_dir = TempDir::new().unwrap();
        let snapshot_path = temp_dir.path().join("particles.json");
        let shutdown = Arc::new(AtomicBool::new(false));
        // The mock raises the shutdown flag while serving the third read,
        // i.e. mid-period with a device call in flight.
        let state = MockState::with_stop(
            vec![Ok(sample(1.0)), Ok(sample(2.0)), Ok(sample(3.0))],
            Some((3, shutdown.clone())),
        );
        let readings = SharedReading::new();

        let worker = CycleWorker {
            config: ControllerConfig::default(),
            opener: Box::new(MockOpener {
                state: state.clone(),
            }),
            device: None,
            readings: readings.clone(),
            exporter: SnapshotExporter::new(&snapshot_path),
            clock: Arc::new(ManualClock::new(0)),
            shutdown,
            wake_failures: 0,
        };

        worker.run();

        // The last reading before shutdown is retained, nothing is exported
        // for the unfinished period, and the device was slept and closed.
        assert_eq!(readings.latest().unwrap().pm2_5, 3.0);
        assert!(!snapshot_path.exists());
        assert!(state.sleep_calls.load(Ordering::SeqCst) >= 1);
        assert_eq!(state.close_calls.load(Ordering::SeqCst), 1);
    }

    // ------------------------------------------------------------------
    // Threaded lifecycle tests (real clock, short durations)
    // ------------------------------------------------------------------

    fn fast_config() -> ControllerConfig {
        ControllerConfig {
            read_period: Duration::from_millis(60),
            sleep_period: Duration::from_millis(30),
            sample_interval: Duration::from_millis(10),
            wake_retry_backoff: Duration::from_millis(5),
            wake_failure_limit: 3,
            offline_retry_interval: Duration::from_millis(10),
            warmup: Duration::ZERO,
            log_raw: false,
        }
    }

    #[test]
    fn test_controller_starts_and_stops() {
        let temp_dir = TempDir::new().unwrap();
        let state = MockState::new(Vec::new());
        let controller = DutyCycleController::start(
            fast_config(),
            Box::new(MockOpener {
                state: state.clone(),
            }),
            SharedReading::new(),
            SnapshotExporter::new(temp_dir.path().join("particles.json")),
        );

        assert!(controller.is_running());
        thread::sleep(Duration::from_millis(50));
        assert!(controller.is_running());

        controller.shutdown();
        thread::sleep(Duration::from_millis(300));
        assert!(!controller.is_running());
        assert_eq!(state.close_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_controller_drop_triggers_shutdown() {
        let temp_dir = TempDir::new().unwrap();
        let state = MockState::new(Vec::new());

        {
            let _controller = DutyCycleController::start(
                fast_config(),
                Box::new(MockOpener {
                    state: state.clone(),
                }),
                SharedReading::new(),
                SnapshotExporter::new(temp_dir.path().join("particles.json")),
            );
            thread::sleep(Duration::from_millis(30));
        }
        // Drop blocks on join, so the device is released by now.
        assert_eq!(state.close_calls.load(Ordering::SeqCst), 1);
    }
}
