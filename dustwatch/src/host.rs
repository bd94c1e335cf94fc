//! Host integration boundary.
//!
//! The host system (a weather-station engine, a metrics scraper, ...) calls
//! in once per data cycle to fold the latest particulate values into its own
//! record. When no reading has ever been taken the fields are simply absent;
//! the adapter never fabricates zeros.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::sensor::ReadingProvider;

/// Record key for the PM2.5 concentration.
pub const FIELD_PM2_5: &str = "pm2_5";

/// Record key for the PM10 concentration.
pub const FIELD_PM10_0: &str = "pm10_0";

/// Pull-side adapter merging sensor readings into host records.
pub struct HostAdapter {
    readings: Arc<dyn ReadingProvider>,
}

impl HostAdapter {
    pub fn new(readings: Arc<dyn ReadingProvider>) -> Self {
        Self { readings }
    }

    /// Merge the latest reading's PM fields into `record`.
    ///
    /// Returns `true` if fields were merged, `false` if no reading exists
    /// yet (the record is left untouched).
    pub fn merge_into(&self, record: &mut Map<String, Value>) -> bool {
        match self.readings.latest() {
            Some(reading) => {
                record.insert(FIELD_PM2_5.to_string(), Value::from(reading.pm2_5));
                record.insert(FIELD_PM10_0.to_string(), Value::from(reading.pm10_0));
                true
            }
            None => false,
        }
    }
}
