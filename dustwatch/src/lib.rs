//! Dustwatch - duty-cycled acquisition service for the Nova SDS011
//! particulate sensor.
//!
//! A background controller thread owns the serial device exclusively and
//! alternates reading periods (fan on, sampling every couple of seconds)
//! with sleep periods (fan off) to conserve the sensor's rated lifetime.
//! The most recent valid reading is held in a shared cache that any number
//! of consumers can poll, and a JSON snapshot of it is atomically rewritten
//! after every reading period.
//!
//! # High-Level API
//!
//! For most use cases, the [`service`] module provides the whole wiring:
//!
//! ```ignore
//! use dustwatch::config::ConfigFile;
//! use dustwatch::sensor::ReadingProvider;
//! use dustwatch::service::SensorService;
//!
//! let config = ConfigFile::load()?;
//! let service = SensorService::start(&config)?;
//!
//! // Pull the latest reading from any thread, at any time.
//! if let Some(reading) = service.readings().latest() {
//!     println!("PM2.5 = {} µg/m³", reading.pm2_5);
//! }
//!
//! service.stop(); // returns once the serial device is released
//! ```

pub mod config;
pub mod host;
pub mod logging;
pub mod sensor;
pub mod service;
pub mod snapshot;

/// Version of the dustwatch library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
