//! The validated sensor reading exposed to consumers.

use serde::Serialize;

use super::protocol::Sample;

/// Upper sanity bound for PM concentrations in µg/m³.
///
/// The SDS011 reports at most 999.9; anything at or above this ceiling is a
/// corrupt frame that happened to pass the checksum.
pub const PM_SANITY_CEILING: f64 = 1000.0;

/// One validated particulate-matter reading.
///
/// Immutable once constructed; the controller builds a fresh `Reading` for
/// every accepted sample. Serializes to the snapshot-file shape:
/// `{"dateTime": ..., "pm2_5": ..., "pm10_0": ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    /// Acquisition time, seconds since the Unix epoch.
    #[serde(rename = "dateTime")]
    pub timestamp: i64,
    /// PM2.5 concentration in µg/m³.
    pub pm2_5: f64,
    /// PM10 concentration in µg/m³.
    pub pm10_0: f64,
}

impl Reading {
    /// Build a reading from a raw sample, stamping it with `timestamp`.
    ///
    /// Returns `None` if either PM value is out of the plausible range
    /// (negative, non-finite, or at/above [`PM_SANITY_CEILING`]). Such
    /// samples are discarded, never published.
    pub fn from_sample(sample: &Sample, timestamp: i64) -> Option<Self> {
        if !in_range(sample.pm2_5) || !in_range(sample.pm10_0) {
            return None;
        }
        Some(Self {
            timestamp,
            pm2_5: sample.pm2_5,
            pm10_0: sample.pm10_0,
        })
    }
}

fn in_range(value: f64) -> bool {
    value.is_finite() && value >= 0.0 && value < PM_SANITY_CEILING
}
