//! Clock abstraction for the duty-cycle controller.
//!
//! All time observation and waiting in the controller goes through the
//! [`Clock`] trait so cycle timing can be driven with virtual time in tests
//! instead of real delays. [`SystemClock`] is the production implementation;
//! [`ManualClock`] advances only when told to.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;

/// Granularity at which interruptible waits poll the shutdown flag.
///
/// Bounds shutdown latency during long waits (the sleep period can be a
/// minute or more) without busy-spinning.
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Time source and interruptible waiting.
pub trait Clock: Send + Sync {
    /// Monotonic now, for countdowns and deadlines.
    fn now(&self) -> Instant;

    /// Wall-clock now, seconds since the Unix epoch, for timestamping
    /// readings.
    fn epoch_secs(&self) -> i64;

    /// Wait for `duration` or until `shutdown` is raised, whichever comes
    /// first. Returns `false` if shutdown cut the wait short.
    fn wait(&self, duration: Duration, shutdown: &AtomicBool) -> bool;
}

/// Real time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_secs(&self) -> i64 {
        Utc::now().timestamp()
    }

    fn wait(&self, duration: Duration, shutdown: &AtomicBool) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if shutdown.load(Ordering::Relaxed) {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(SHUTDOWN_POLL_INTERVAL));
        }
    }
}

/// Virtual time for tests: `now` and the epoch move only via [`advance`]
/// or when a wait consumes its duration.
///
/// [`advance`]: ManualClock::advance
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    offset: Mutex<Duration>,
    epoch_start: i64,
}

impl ManualClock {
    /// Create a clock reading `epoch_secs` as the current wall-clock time.
    pub fn new(epoch_secs: i64) -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            epoch_start: epoch_secs,
        }
    }

    /// Move time forward.
    pub fn advance(&self, duration: Duration) {
        let mut offset = self.offset.lock().unwrap();
        *offset += duration;
    }

    /// Total virtual time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn epoch_secs(&self) -> i64 {
        self.epoch_start + self.elapsed().as_secs() as i64
    }

    fn wait(&self, duration: Duration, shutdown: &AtomicBool) -> bool {
        if shutdown.load(Ordering::Relaxed) {
            return false;
        }
        self.advance(duration);
        !shutdown.load(Ordering::Relaxed)
    }
}
