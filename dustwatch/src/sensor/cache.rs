//! Latest-reading cache shared between the controller and its consumers.
//!
//! Single writer (the controller thread), any number of readers (host
//! adapter, exporter, diagnostics). Publishing replaces the whole value
//! under a write lock and reads copy it out, so a reader can never observe
//! a half-updated reading and never blocks for longer than the swap.

use std::sync::{Arc, RwLock};

use super::reading::Reading;

/// Read-side interface to the latest sensor reading (pull API).
pub trait ReadingProvider: Send + Sync {
    /// The most recently published reading, or `None` before the first
    /// successful sample.
    fn latest(&self) -> Option<Reading>;

    /// Whether any reading has ever been published.
    fn has_reading(&self) -> bool {
        self.latest().is_some()
    }
}

/// Thread-safe holder of the most recent valid [`Reading`].
///
/// Clones share the same underlying cell.
#[derive(Debug, Clone, Default)]
pub struct SharedReading {
    inner: Arc<RwLock<Option<Reading>>>,
}

impl SharedReading {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held reading. Called only by the controller.
    pub fn publish(&self, reading: Reading) {
        let mut slot = self.inner.write().unwrap();
        *slot = Some(reading);
    }
}

impl ReadingProvider for SharedReading {
    fn latest(&self) -> Option<Reading> {
        *self.inner.read().unwrap()
    }
}

impl ReadingProvider for Arc<SharedReading> {
    fn latest(&self) -> Option<Reading> {
        (**self).latest()
    }
}
