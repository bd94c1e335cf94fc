//! Snapshot exporter: durable JSON file holding the latest reading.
//!
//! The destination is overwritten wholesale each export via atomic replace:
//! the reading is serialized to a uniquely-named temporary file in the same
//! directory, synced to disk, then renamed over the destination. The rename
//! is the only step that mutates the visible path, so a crash at any point
//! leaves either the previous complete snapshot or the new one, never a
//! truncated file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::sensor::Reading;

/// Snapshot export failures. All are logged and retried next cycle.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The snapshot directory could not be created.
    #[error("failed to create snapshot directory '{path}': {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing or syncing the temporary file failed.
    #[error("failed to write snapshot: {0}")]
    Write(#[from] io::Error),

    /// Serializing the reading failed.
    #[error("failed to serialize reading: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Renaming the temporary file over the destination failed.
    #[error("failed to replace snapshot '{path}': {source}")]
    Replace {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

/// Writes the latest reading to a JSON file with atomic replace.
#[derive(Debug, Clone)]
pub struct SnapshotExporter {
    path: PathBuf,
}

impl SnapshotExporter {
    /// Create an exporter targeting `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The destination path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize `reading` and atomically replace the destination with it.
    pub fn export(&self, reading: &Reading) -> Result<(), ExportError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|source| ExportError::Directory {
            path: dir.clone(),
            source,
        })?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer(&mut tmp, reading)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|source| ExportError::Replace {
                path: self.path.clone(),
                source,
            })?;
        Ok(())
    }
}
