//! WAL record codec
//!
//! Encodes key/value pairs as `key=value\n` lines and parses byte streams
//! back into records, carrying any unterminated tail forward so a read
//! boundary may fall anywhere inside a record.

use bytes::{Buf, BytesMut};

use crate::error::{KvError, Result};

/// Byte that ends every record. Never valid inside a key or value.
pub const TERMINATOR: u8 = b'\n';

/// Byte between key and value. The first occurrence in a line wins.
pub const SEPARATOR: u8 = b'=';

/// A decoded key/value pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub value: String,
}

impl Record {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Serialize this record (see [`encode`])
    pub fn encode(&self) -> Vec<u8> {
        encode(&self.key, &self.value)
    }
}

/// Serialize a pair as `key=value\n`.
///
/// No validation is done here; use [`validate`] first. A terminator inside
/// `key` or `value` would split the record in two on replay.
pub fn encode(key: &str, value: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(key.len() + value.len() + 2);
    buf.extend_from_slice(key.as_bytes());
    buf.push(SEPARATOR);
    buf.extend_from_slice(value.as_bytes());
    buf.push(TERMINATOR);
    buf
}

/// Reject pairs whose encoding would not decode back to the same pair
pub fn validate(key: &str, value: &str) -> Result<()> {
    if key.is_empty() {
        return Err(KvError::InvalidRecord("key must not be empty".to_string()));
    }
    if value.is_empty() {
        return Err(KvError::InvalidRecord("value must not be empty".to_string()));
    }
    if key.as_bytes().contains(&TERMINATOR) {
        return Err(KvError::InvalidRecord("key contains a newline".to_string()));
    }
    if value.as_bytes().contains(&TERMINATOR) {
        return Err(KvError::InvalidRecord("value contains a newline".to_string()));
    }
    if key.as_bytes().contains(&SEPARATOR) {
        return Err(KvError::InvalidRecord("key contains '='".to_string()));
    }
    Ok(())
}

/// Decode a single line (terminator already stripped).
///
/// Returns `None` for malformed lines: no separator, an empty key, or bytes
/// that are not UTF-8. An empty value is accepted.
pub fn decode(line: &[u8]) -> Option<Record> {
    let split = line.iter().position(|&b| b == SEPARATOR)?;
    let (key, rest) = line.split_at(split);
    if key.is_empty() {
        return None;
    }
    let key = std::str::from_utf8(key).ok()?;
    let value = std::str::from_utf8(&rest[1..]).ok()?;
    Some(Record::new(key, value))
}

/// Split `buf` into complete lines and the unterminated remainder.
fn split_complete(buf: &[u8]) -> (Option<&[u8]>, &[u8]) {
    match buf.iter().rposition(|&b| b == TERMINATOR) {
        // Drop the final terminator so `split` yields no trailing empty line
        Some(last) => (Some(&buf[..last]), &buf[last + 1..]),
        None => (None, buf),
    }
}

/// Scan a buffer of zero or more complete records followed by at most one
/// incomplete record.
///
/// Returns every decodable complete record and the unterminated trailing
/// bytes, untouched, to be prepended to the next read. Malformed lines are
/// skipped.
pub fn scan(buf: &[u8]) -> (Vec<Record>, &[u8]) {
    let (complete, remainder) = split_complete(buf);
    let records: Vec<Record> = complete
        .map(|lines| lines.split(|&b| b == TERMINATOR).filter_map(decode).collect())
        .unwrap_or_default();
    (records, remainder)
}

/// Incremental parser over an arbitrarily sliced byte stream.
///
/// Holds only the unterminated bytes between [`feed`](Self::feed) calls, so
/// feeding the same stream in any chunking yields the same records.
#[derive(Debug, Default)]
pub struct RecordScanner {
    /// Bytes of a record whose terminator has not been seen yet
    pending: BytesMut,

    /// Complete lines that failed to decode
    malformed: u64,
}

impl RecordScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every record it completes
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Record> {
        let mut records = Vec::new();
        self.feed_with(chunk, |record| records.push(record));
        records
    }

    /// Like [`feed`](Self::feed), handing each record to `apply` in log order
    pub fn feed_with(&mut self, chunk: &[u8], mut apply: impl FnMut(Record)) {
        self.pending.extend_from_slice(chunk);

        let (complete, remainder) = split_complete(&self.pending);
        let consumed = self.pending.len() - remainder.len();

        if let Some(lines) = complete {
            for line in lines.split(|&b| b == TERMINATOR) {
                match decode(line) {
                    Some(record) => apply(record),
                    None => {
                        self.malformed += 1;
                        tracing::warn!(
                            "Skipping malformed WAL record ({} bytes)",
                            line.len()
                        );
                    }
                }
            }
        }

        self.pending.advance(consumed);
    }

    /// Unterminated bytes carried forward to the next chunk
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Number of complete lines skipped as malformed so far
    pub fn malformed(&self) -> u64 {
        self.malformed
    }

    /// End of stream: discard any torn tail and return how many bytes it had
    pub fn finish(mut self) -> usize {
        let torn = self.pending.len();
        self.pending.clear();
        torn
    }
}
