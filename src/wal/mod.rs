//! Write-Ahead Log (WAL) Module
//!
//! Provides durability through append-only logging.
//!
//! ## Responsibilities
//! - Append each mutation before it reaches the index
//! - Periodic and final durability barriers (fsync)
//! - Crash recovery by chunked replay, tolerating a torn final record
//!
//! ## File Format
//! ```text
//! key1=value1\n
//! key2=value with = signs\n
//! key1=value2\n
//! key3=torn        <- no terminator: discarded on recovery
//! ```
//! No header, version or checksum. The first `=` on a line splits key from
//! value, so values may contain `=` but keys may not.

mod record;
mod writer;
mod recovery;

pub use record::{decode, encode, scan, validate, Record, RecordScanner, SEPARATOR, TERMINATOR};
pub use writer::{LogFile, WalState, WalStats, WalWriter};
pub use recovery::{RecoveryResult, WalRecovery};
