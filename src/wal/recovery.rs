//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.
//!
//! The log is read front to back in fixed-size chunks. Each chunk is fed to a
//! [`RecordScanner`], which hands back complete records and keeps the
//! unterminated tail for the next chunk. Bytes still pending at end of file
//! are a torn final append and are dropped.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read};
use std::path::Path;

use crate::error::{KvError, Result};
use crate::index::Index;
use super::record::{Record, RecordScanner};

/// Replays the log into an [`Index`]
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Complete records decoded and applied (duplicates included)
    pub records_recovered: u64,

    /// Complete lines skipped because they could not be decoded
    pub records_malformed: u64,

    /// Total bytes read from the log
    pub bytes_read: u64,

    /// Number of non-empty reads
    pub chunks_read: u64,

    /// Unterminated bytes at end of file that were discarded
    pub discarded_tail_bytes: u64,
}

impl RecoveryResult {
    /// Whether the log ended in a partial record
    pub fn was_truncated(&self) -> bool {
        self.discarded_tail_bytes > 0
    }
}

impl WalRecovery {
    /// Replay the log at `path` into `index`.
    ///
    /// Records are applied in file order, so the last write for a key wins.
    /// A missing file yields an empty result.
    pub fn recover(path: &Path, chunk_size: usize, index: &Index) -> Result<RecoveryResult> {
        Self::scan_file(path, chunk_size, |record| {
            index.insert(record.key, record.value);
        })
    }

    /// Scan the log at `path` without applying anything
    pub fn verify(path: &Path, chunk_size: usize) -> Result<RecoveryResult> {
        Self::scan_file(path, chunk_size, |_| {})
    }

    /// Cut off the torn tail a previous scan discarded; nothing replay applies is removed.
    pub fn truncate_torn_tail(path: &Path, result: &RecoveryResult) -> Result<()> {
        if !result.was_truncated() {
            return Ok(());
        }

        let valid_len = result.bytes_read - result.discarded_tail_bytes;
        let truncate = || -> io::Result<()> {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len)?;
            file.sync_all()
        };
        truncate().map_err(|source| KvError::RecoveryFailed {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::warn!(
            "Truncated WAL {} to {} bytes to drop a partial record",
            path.display(),
            valid_len
        );
        Ok(())
    }

    /// Replay any byte source, handing each complete record to `apply`
    pub fn replay<R: Read>(
        mut reader: R,
        chunk_size: usize,
        mut apply: impl FnMut(Record),
    ) -> io::Result<RecoveryResult> {
        let mut chunk = vec![0u8; chunk_size.max(1)];
        let mut scanner = RecordScanner::new();
        let mut result = RecoveryResult::default();

        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            result.bytes_read += n as u64;
            result.chunks_read += 1;
            scanner.feed_with(&chunk[..n], |record| {
                result.records_recovered += 1;
                apply(record);
            });
        }

        result.records_malformed = scanner.malformed();
        result.discarded_tail_bytes = scanner.finish() as u64;
        Ok(result)
    }

    fn scan_file(
        path: &Path,
        chunk_size: usize,
        apply: impl FnMut(Record),
    ) -> Result<RecoveryResult> {
        let failed = |source| KvError::RecoveryFailed {
            path: path.to_path_buf(),
            source,
        };

        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No WAL at {}, starting empty", path.display());
                return Ok(RecoveryResult::default());
            }
            Err(e) => return Err(failed(e)),
        };

        let result = Self::replay(file, chunk_size, apply).map_err(failed)?;

        tracing::debug!(
            "WAL scan read {} bytes in {} chunks",
            result.bytes_read,
            result.chunks_read
        );
        if result.was_truncated() {
            tracing::warn!(
                "Discarded {} bytes of incomplete record at end of WAL",
                result.discarded_tail_bytes
            );
        }
        if result.records_malformed > 0 {
            tracing::warn!("Skipped {} malformed WAL records", result.records_malformed);
        }

        Ok(result)
    }
}
