//! Store Module
//!
//! The key-value store that coordinates the WAL and the index.
//!
//! ## Responsibilities
//! - Startup: clear the index, replay the WAL, then open it for appends
//! - Write path: append to the WAL, and only on success update the index
//! - Shutdown: stop the flusher, final sync, close

use std::fs;
use std::path::Path;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{KvError, Result};
use crate::index::Index;
use crate::wal::{LogFile, RecoveryResult, WalRecovery, WalState, WalStats, WalWriter};

/// A WAL-backed key-value store
///
/// ## Concurrency Model
///
/// - **Writes** (`set`): serialized by `write_lock`
///   - Lock order: write_lock → WAL lock, released → index write lock
///   - The WAL lock is never held while touching the index
///   - Holding `write_lock` across append + apply keeps the index in the
///     same per-key order as the log
///
/// - **Reads** (`get`): index read lock only, concurrent with each other
///
/// - **Flusher**: takes only the WAL lock, so it delays `set` by at most one
///   sync
///
/// Share between request handlers with `Arc<Store>`.
pub struct Store {
    /// Store configuration
    config: Config,

    /// Write-ahead log (internally locked)
    wal: WalWriter,

    /// Current key → value state (internal RwLock)
    index: Index,

    /// Serializes set / startup / shutdown
    write_lock: Mutex<()>,

    /// Stats from the most recent startup
    last_recovery: Mutex<Option<RecoveryResult>>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Create a store that has not started yet
    pub fn new(config: Config) -> Self {
        Self {
            config,
            wal: WalWriter::new(),
            index: Index::new(),
            write_lock: Mutex::new(()),
            last_recovery: Mutex::new(None),
        }
    }

    /// Create and start a store
    pub fn open(config: Config) -> Result<Self> {
        let store = Self::new(config);
        store.startup()?;
        Ok(store)
    }

    /// Open with a log path (convenience method)
    ///
    /// Uses default config with the specified WAL path
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().wal_path(path).build())
    }

    /// Bring the store up.
    ///
    /// 1. Validate config
    /// 2. Clear the index
    /// 3. Replay the WAL to completion
    /// 4. Cut off a torn final record, if any
    /// 5. Open the WAL for appending
    /// 6. Start the periodic flusher
    ///
    /// Recovery finishes before the file is opened for append, so replay
    /// never reads bytes written by this run.
    pub fn startup(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        let wal_path = &self.config.wal_path;

        let recovered = self.recover()?;
        WalRecovery::truncate_torn_tail(wal_path, &recovered)?;

        if let Some(parent) = wal_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| KvError::WalOpenFailed {
                path: wal_path.clone(),
                source,
            })?;
        }
        self.wal.open(wal_path)?;
        self.start_flusher()
    }

    /// Like [`startup`](Self::startup), but appends go to `log` instead of a
    /// file opened at the configured path. Recovery still reads that path,
    /// and a torn tail there is left in place.
    pub fn startup_with_log<L: LogFile>(&self, log: L) -> Result<()> {
        let _write_guard = self.write_lock.lock();

        self.recover()?;
        self.wal.attach(log)?;
        self.start_flusher()
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Result<String> {
        self.index.get(key).ok_or_else(|| {
            tracing::trace!("Key not found: {}", key);
            KvError::NotFound
        })
    }

    /// Set a key-value pair
    ///
    /// Steps:
    /// 1. Acquire write lock
    /// 2. Append to WAL
    /// 3. Update index (only if step 2 succeeded)
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let _write_guard = self.write_lock.lock();

        self.wal.append(key, value)?;
        self.index.insert(key.to_string(), value.to_string());

        Ok(())
    }

    /// Force a WAL sync outside the periodic schedule
    pub fn sync(&self) -> Result<()> {
        self.wal.sync()
    }

    /// Stop the flusher, sync and close the WAL.
    ///
    /// Errors are logged and returned but leave the store closed; callers
    /// may carry on with their own exit. Calling again is a no-op.
    pub fn shutdown(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();

        match self.wal.stop_and_close() {
            Ok(()) => {
                tracing::info!("Store shut down ({} keys in memory)", self.index.len());
                Ok(())
            }
            Err(e) => {
                tracing::error!("WAL shutdown failed: {}", e);
                Err(e)
            }
        }
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Clear the index and replay the WAL into it (write lock held)
    fn recover(&self) -> Result<RecoveryResult> {
        self.config.validate()?;
        if matches!(
            self.wal.state(),
            WalState::Open | WalState::Failed | WalState::Closing
        ) {
            return Err(KvError::AlreadyStarted);
        }

        let wal_path = &self.config.wal_path;
        tracing::info!("Recovering from WAL at {}", wal_path.display());

        self.index.clear();
        let result = WalRecovery::recover(wal_path, self.config.recovery_chunk_size, &self.index)?;

        tracing::info!(
            "Recovery complete: {} records replayed, {} keys loaded",
            result.records_recovered,
            self.index.len()
        );
        *self.last_recovery.lock() = Some(result.clone());
        Ok(result)
    }

    fn start_flusher(&self) -> Result<()> {
        if let Err(e) = self.wal.start_periodic_flush(self.config.flush_interval) {
            if let Err(close_err) = self.wal.stop_and_close() {
                tracing::error!("Failed to close WAL after flusher error: {}", close_err);
            }
            return Err(e);
        }
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of keys in the index
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Sorted copy of every key → value
    pub fn snapshot(&self) -> std::collections::BTreeMap<String, String> {
        self.index.snapshot()
    }

    /// Stats from the most recent startup, if any
    pub fn last_recovery(&self) -> Option<RecoveryResult> {
        self.last_recovery.lock().clone()
    }

    /// WAL writer phase
    pub fn wal_state(&self) -> WalState {
        self.wal.state()
    }

    /// WAL append/sync counters
    pub fn wal_stats(&self) -> WalStats {
        self.wal.stats()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
