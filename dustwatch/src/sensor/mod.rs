//! SDS011 acquisition subsystem.
//!
//! This module is a **single source of truth** for the latest particulate
//! reading: one background thread owns the serial device exclusively and
//! duty-cycles it, and any number of consumers pull the most recent valid
//! reading from a shared cache.
//!
//! # Architecture
//!
//! ```text
//! DutyCycleController --commands/reads--> SensorDevice (serial)
//!         | validates + timestamps
//!         v
//! SharedReading --latest()--> consumers (host adapter, exporter, CLI)
//! ```
//!
//! The controller alternates reading periods (fan on, sampling every few
//! seconds) with sleep periods (fan off) to stretch the sensor's rated
//! laser/fan lifetime. Transient read failures skip a sample; the cache
//! keeps returning the last good reading through any number of failures.
//!
//! # Components
//!
//! - [`protocol`] - pure SDS011 wire framing (commands, frames, checksums)
//! - [`driver`] - serial transport, `SensorDevice`/`DeviceOpener` seam
//! - [`reading`] - the validated `Reading` value type
//! - [`cache`] - `SharedReading`, the single-writer/many-reader cell
//! - [`controller`] - the wake/sample/sleep state machine
//! - [`clock`] - time source abstraction so cycle timing is testable
//! - [`state`] - the `CycleState` enum
//!
//! # Usage
//!
//! ```ignore
//! use dustwatch::sensor::{
//!     ControllerConfig, DutyCycleController, ReadingProvider, Sds011Opener,
//!     SharedReading,
//! };
//! use dustwatch::snapshot::SnapshotExporter;
//!
//! let readings = SharedReading::new();
//! let opener = Sds011Opener::new("/dev/ttyUSB0", std::time::Duration::from_secs(3));
//! let exporter = SnapshotExporter::new("/var/lib/dustwatch/particles.json");
//! let controller = DutyCycleController::start(
//!     ControllerConfig::default(),
//!     Box::new(opener),
//!     readings.clone(),
//!     exporter,
//! );
//!
//! // Any thread may poll the latest reading.
//! if let Some(reading) = readings.latest() {
//!     println!("PM2.5: {} µg/m³", reading.pm2_5);
//! }
//! ```

mod cache;
mod clock;
mod controller;
mod driver;
pub mod protocol;
mod reading;
mod state;

pub use cache::{ReadingProvider, SharedReading};
pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{ControllerConfig, DutyCycleController};
pub use driver::{DeviceOpener, DriverError, Sds011Device, Sds011Opener, SensorDevice};
pub use protocol::{FrameError, Sample};
pub use reading::{Reading, PM_SANITY_CEILING};
pub use state::CycleState;
