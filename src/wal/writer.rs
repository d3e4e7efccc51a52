//! WAL Writer
//!
//! Owns the append-only log handle. Every append, periodic flush, final
//! flush and close runs under one lock, so records land in the file in the
//! order their `append` calls acquired it.
//!
//! ## Lifecycle
//! ```text
//! Unopened ──open──▶ Open ──stop_and_close──▶ Closing ──▶ Closed
//!                      │                          ▲           │
//!                 failed write                    │           │
//!                      ▼                          │           │
//!                   Failed ──stop_and_close───────┘           │
//!    ▲───────────────────────── open (restart) ───────────────┘
//! ```
//!
//! A write that errors may have left part of a record in the file. The
//! writer then refuses further appends so the fragment stays the last bytes
//! of the log, where recovery discards it and startup cuts it off.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, select, Receiver, Sender};
use parking_lot::Mutex;

use crate::error::{KvError, Result};
use super::record;

/// A log handle the writer can append to and force to stable storage
pub trait LogFile: Write + Send + 'static {
    /// Durability barrier: everything written so far survives a crash
    fn sync(&mut self) -> io::Result<()>;

    /// Release the handle. Called once, after the final sync.
    fn close(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}

impl LogFile for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Observable writer phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalState {
    Unopened,
    Open,
    /// A write failed; appends are refused until restart
    Failed,
    Closing,
    Closed,
}

/// Counters since the writer was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalStats {
    pub records_appended: u64,
    pub bytes_appended: u64,
    pub syncs: u64,
    pub failed_syncs: u64,
}

enum WriterState {
    Unopened,
    Open(Box<dyn LogFile>),
    /// Log may end in a partial record; still synced and closed normally
    Failed(Box<dyn LogFile>),
    /// Rejecting appends; the handle waits for the final flush
    Closing(Box<dyn LogFile>),
    Closed,
}

impl WriterState {
    fn phase(&self) -> WalState {
        match self {
            WriterState::Unopened => WalState::Unopened,
            WriterState::Open(_) => WalState::Open,
            WriterState::Failed(_) => WalState::Failed,
            WriterState::Closing(_) => WalState::Closing,
            WriterState::Closed => WalState::Closed,
        }
    }

    /// Error for an append or flush attempted outside `Open`
    fn not_open_error(&self) -> KvError {
        match self {
            WriterState::Unopened => KvError::NotStarted,
            WriterState::Failed(_) => KvError::WriteFailed(io::Error::new(
                ErrorKind::Other,
                "WAL refused appends after an earlier write failure",
            )),
            _ => KvError::WriteAfterClose,
        }
    }
}

/// State shared with the flusher thread
struct Shared {
    /// The WAL lock
    state: Mutex<WriterState>,

    records_appended: AtomicU64,
    bytes_appended: AtomicU64,
    syncs: AtomicU64,
    failed_syncs: AtomicU64,
}

impl Shared {
    fn sync_file(&self, file: &mut dyn LogFile) -> Result<()> {
        match file.sync() {
            Ok(()) => {
                self.syncs.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.failed_syncs.fetch_add(1, Ordering::Relaxed);
                Err(KvError::FlushFailed(e))
            }
        }
    }

    /// One periodic tick. Skips `Closing`; the final flush covers it.
    fn flush_tick(&self) {
        let mut state = self.state.lock();
        let (WriterState::Open(file) | WriterState::Failed(file)) = &mut *state else {
            return;
        };

        tracing::debug!("Syncing WAL");
        if let Err(e) = self.sync_file(file.as_mut()) {
            tracing::warn!("Periodic WAL sync failed: {}", e);
        }
    }
}

/// Handle to the background flush thread
struct Flusher {
    /// Dropping this disconnects the channel, which stops the loop
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Appends records to the log and keeps it durable
pub struct WalWriter {
    shared: Arc<Shared>,
    flusher: Mutex<Option<Flusher>>,
}

impl WalWriter {
    /// Create a writer with no log attached
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(WriterState::Unopened),
                records_appended: AtomicU64::new(0),
                bytes_appended: AtomicU64::new(0),
                syncs: AtomicU64::new(0),
                failed_syncs: AtomicU64::new(0),
            }),
            flusher: Mutex::new(None),
        }
    }

    /// Open (or create) the log file at `path` for appending
    pub fn open(&self, path: &Path) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| KvError::WalOpenFailed {
                path: path.to_path_buf(),
                source,
            })?;

        self.attach(file)?;
        tracing::info!("WAL opened for appending at {}", path.display());
        Ok(())
    }

    /// Append through an already-open handle
    pub fn attach<L: LogFile>(&self, log: L) -> Result<()> {
        let mut state = self.shared.state.lock();
        if matches!(
            *state,
            WriterState::Open(_) | WriterState::Failed(_) | WriterState::Closing(_)
        ) {
            return Err(KvError::AlreadyStarted);
        }
        *state = WriterState::Open(Box::new(log));
        Ok(())
    }

    /// Current lifecycle phase
    pub fn state(&self) -> WalState {
        self.shared.state.lock().phase()
    }

    pub fn is_open(&self) -> bool {
        self.state() == WalState::Open
    }

    /// Append one record.
    ///
    /// Returns once the OS has accepted the bytes. The record is durable only
    /// after the next sync (periodic, explicit or final).
    ///
    /// A failed write moves the writer to [`WalState::Failed`], and every
    /// later append returns `WriteFailed` until the log is reopened.
    pub fn append(&self, key: &str, value: &str) -> Result<()> {
        record::validate(key, value)?;
        let bytes = record::encode(key, value);

        let mut state = self.shared.state.lock();
        let file = match &mut *state {
            WriterState::Open(file) => file,
            other => return Err(other.not_open_error()),
        };

        if let Err(e) = file.write_all(&bytes) {
            if let WriterState::Open(file) = std::mem::replace(&mut *state, WriterState::Closed) {
                *state = WriterState::Failed(file);
            }
            tracing::error!("WAL append failed, refusing further appends: {}", e);
            return Err(KvError::WriteFailed(e));
        }

        self.shared.records_appended.fetch_add(1, Ordering::Relaxed);
        self.shared
            .bytes_appended
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Force a durability barrier now
    pub fn sync(&self) -> Result<()> {
        let mut state = self.shared.state.lock();
        match &mut *state {
            WriterState::Open(file) | WriterState::Failed(file) => {
                self.shared.sync_file(file.as_mut())
            }
            other => Err(other.not_open_error()),
        }
    }

    /// Spawn the background thread that syncs every `interval`.
    ///
    /// A slow sync delays the next tick rather than queueing extra ones.
    /// Calling this while a flusher is already running is a no-op.
    pub fn start_periodic_flush(&self, interval: Duration) -> Result<()> {
        {
            let state = self.shared.state.lock();
            if !matches!(&*state, WriterState::Open(_)) {
                return Err(state.not_open_error());
            }
        }

        let mut flusher = self.flusher.lock();
        if flusher.is_some() {
            tracing::debug!("WAL flusher already running");
            return Ok(());
        }

        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        let ticker = channel::tick(interval);
        let shared = Arc::clone(&self.shared);

        let handle = thread::Builder::new()
            .name("walkv-flusher".to_string())
            .spawn(move || run_flusher(shared, ticker, stop_rx))?;

        tracing::debug!("WAL flusher started (interval {:?})", interval);
        *flusher = Some(Flusher {
            stop: stop_tx,
            handle,
        });
        Ok(())
    }

    /// Stop the flusher, sync one last time and close the handle.
    ///
    /// Appends are rejected from the moment this is called. No tick runs
    /// after the flusher has been joined, so the final sync is the last
    /// operation on the file. A no-op when nothing is open.
    ///
    /// A call that finds the writer already `Closing` returns `Ok` at once,
    /// possibly before the other caller's final sync has finished. Callers
    /// that need the close to be complete must serialise shutdown.
    pub fn stop_and_close(&self) -> Result<()> {
        let was_open = {
            let mut state = self.shared.state.lock();
            match std::mem::replace(&mut *state, WriterState::Closed) {
                WriterState::Open(file) | WriterState::Failed(file) => {
                    *state = WriterState::Closing(file);
                    true
                }
                // Already closing elsewhere, closed, or never opened
                other => {
                    *state = other;
                    false
                }
            }
        };

        self.stop_flusher();
        if !was_open {
            return Ok(());
        }

        let mut state = self.shared.state.lock();
        let WriterState::Closing(mut file) = std::mem::replace(&mut *state, WriterState::Closed)
        else {
            return Ok(());
        };

        let synced = self.shared.sync_file(file.as_mut());
        let closed = file.close().map_err(KvError::CloseFailed);

        match (synced, closed) {
            (Err(flush_err), Err(close_err)) => {
                tracing::error!("WAL close failed after flush failure: {}", close_err);
                Err(flush_err)
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => {
                tracing::debug!("WAL closed");
                Ok(())
            }
        }
    }

    /// Counters snapshot
    pub fn stats(&self) -> WalStats {
        WalStats {
            records_appended: self.shared.records_appended.load(Ordering::Relaxed),
            bytes_appended: self.shared.bytes_appended.load(Ordering::Relaxed),
            syncs: self.shared.syncs.load(Ordering::Relaxed),
            failed_syncs: self.shared.failed_syncs.load(Ordering::Relaxed),
        }
    }

    /// Signal the flusher and wait for it to exit
    fn stop_flusher(&self) {
        let Some(Flusher { stop, handle }) = self.flusher.lock().take() else {
            return;
        };

        drop(stop);
        if handle.join().is_err() {
            tracing::error!("WAL flusher thread panicked");
        } else {
            tracing::debug!("WAL flusher stopped");
        }
    }
}

impl Default for WalWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WalWriter {
    fn drop(&mut self) {
        if let Err(e) = self.stop_and_close() {
            tracing::error!("Failed to close WAL on drop: {}", e);
        }
    }
}

fn run_flusher(shared: Arc<Shared>, ticker: Receiver<std::time::Instant>, stop: Receiver<()>) {
    loop {
        let stopped = select! {
            recv(ticker) -> _ => false,
            recv(stop) -> _ => true,
        };
        if stopped {
            break;
        }
        shared.flush_tick();
    }
}
