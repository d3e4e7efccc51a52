//! Configuration for walkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{KvError, Result};

/// Main configuration for a walkv store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Path of the append-only log file. Created on first startup if absent.
    pub wal_path: PathBuf,

    /// How often the background flusher forces a durability barrier
    pub flush_interval: Duration,

    // -------------------------------------------------------------------------
    // Recovery Configuration
    // -------------------------------------------------------------------------
    /// Read size used when replaying the log at startup (in bytes).
    /// Any value >= 1 yields the same recovered state.
    pub recovery_chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wal_path: PathBuf::from("wal.log"),
            flush_interval: Duration::from_secs(5),
            recovery_chunk_size: 100,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the values can drive a store
    pub fn validate(&self) -> Result<()> {
        if self.recovery_chunk_size == 0 {
            return Err(KvError::Config(
                "recovery_chunk_size must be at least 1 byte".to_string(),
            ));
        }
        if self.flush_interval.is_zero() {
            return Err(KvError::Config(
                "flush_interval must be non-zero".to_string(),
            ));
        }
        if self.wal_path.as_os_str().is_empty() {
            return Err(KvError::Config("wal_path must not be empty".to_string()));
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
    /// Set the log file path
    pub fn wal_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.wal_path = path.into();
        self
    }

    /// Set the periodic flush interval
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.flush_interval = interval;
        self
    }

    /// Set the periodic flush interval (in milliseconds)
    pub fn flush_interval_ms(self, ms: u64) -> Self {
        self.flush_interval(Duration::from_millis(ms))
    }

    /// Set the recovery read chunk size (in bytes)
    pub fn recovery_chunk_size(mut self, size: usize) -> Self {
        self.config.recovery_chunk_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
