//! Configuration for arrayvault
//!
//! Settings for opening or creating a container file.

use std::path::PathBuf;

use crate::error::{MarshalError, Result};

/// Container configuration
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Container Location
    // -------------------------------------------------------------------------
    /// Path of the container file
    pub path: PathBuf,

    /// Whether to open an existing container or start a new one
    pub mode: OpenMode,

    // -------------------------------------------------------------------------
    // Durability
    // -------------------------------------------------------------------------
    /// Verify the body checksum when loading a container
    pub verify_checksum: bool,

    /// fsync the container file before it replaces the previous one
    pub sync_on_close: bool,
}

/// How a container path is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Open an existing container; fails if the file is missing
    ReadWrite,

    /// Start an empty container, replacing any existing file on flush
    Create,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data.avlt"),
            mode: OpenMode::ReadWrite,
            verify_checksum: true,
            sync_on_close: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the configuration can be used to open a container
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(MarshalError::Config("container path is empty".to_string()));
        }
        if self.path.is_dir() {
            return Err(MarshalError::Config(format!(
                "container path {} is a directory",
                self.path.display()
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the container file path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Set the open mode
    pub fn mode(mut self, mode: OpenMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Enable or disable checksum verification on load
    pub fn verify_checksum(mut self, verify: bool) -> Self {
        self.config.verify_checksum = verify;
        self
    }

    /// Enable or disable fsync when the container is written
    pub fn sync_on_close(mut self, sync: bool) -> Self {
        self.config.sync_on_close = sync;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
