//! # walkv
//!
//! A single-node key-value store with:
//! - Write-Ahead Logging (WAL): every write is appended before it is applied
//! - Periodic background fsync plus a final fsync on shutdown
//! - Crash recovery by chunked replay, tolerating a torn final record
//! - Concurrent readers, serialized writers
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Request layer (not included)                 │
//! │                 get(key)        set(key, value)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                         Store                                │
//! │            startup() / shutdown() / write_lock               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │ 1. append               │ 2. apply
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  WalWriter  │          │    Index    │
//!   │ (Mutex +    │          │  (RwLock)   │
//!   │  flusher)   │          └──────▲──────┘
//!   └──────┬──────┘                 │ replay at startup
//!          │                 ┌──────┴──────┐
//!          └──── wal.log ───▶│ WalRecovery │
//!                            └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod index;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, Result};
pub use config::Config;
pub use store::Store;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of walkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
