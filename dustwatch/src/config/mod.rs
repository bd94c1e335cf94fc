//! Service configuration: INI file loading, defaults, and validation.
//!
//! Configuration lives at `~/.dustwatch/config.ini` and is loaded once at
//! startup; there is no live reconfiguration. A missing file means defaults,
//! and [`ConfigFile::ensure_exists`] writes a fully commented template for
//! first-time setup.

mod defaults;
mod file;
mod settings;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigError};
pub use settings::{
    ConfigFile, CycleSettings, DeviceSettings, LoggingSettings, OutputSettings,
};
