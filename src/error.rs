//! Error types for walkv
//!
//! Provides a unified error type for all operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for walkv operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // Read Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    NotFound,

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL write failed: {0}")]
    WriteFailed(#[source] io::Error),

    #[error("WAL flush failed: {0}")]
    FlushFailed(#[source] io::Error),

    #[error("WAL close failed: {0}")]
    CloseFailed(#[source] io::Error),

    #[error("WAL recovery failed for {}: {source}", path.display())]
    RecoveryFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to open WAL {} for appending: {source}", path.display())]
    WalOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("WAL write attempted after close")]
    WriteAfterClose,

    #[error("WAL has not been opened")]
    NotStarted,

    #[error("Store is already started")]
    AlreadyStarted,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
