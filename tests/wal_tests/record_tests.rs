//! Tests for the WAL record codec
//!
//! These tests verify:
//! - Encoding layout (`key=value\n`)
//! - First-`=` decoding and malformed line handling
//! - Input validation
//! - Scanning with a trailing partial record
//! - Chunk-size independence of the incremental scanner

use walkv::wal::{decode, encode, scan, validate, Record, RecordScanner};
use walkv::KvError;

/// A log with duplicates, a value containing '=', a malformed line and a
/// torn tail
const LOG: &[u8] = b"a=1\nbb=two\nurl=http://x?q=1&r=2\nnoseparator\na=3\n=orphan\nempty=\nccc=partial";

/// Feed `bytes` to a fresh scanner in `chunk_size` slices
fn scan_in_chunks(bytes: &[u8], chunk_size: usize) -> (Vec<Record>, Vec<u8>, u64) {
    let mut scanner = RecordScanner::new();
    let mut records = Vec::new();
    for chunk in bytes.chunks(chunk_size) {
        records.extend(scanner.feed(chunk));
    }
    (records, scanner.pending().to_vec(), scanner.malformed())
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_layout() {
    assert_eq!(encode("key", "value"), b"key=value\n".to_vec());
}

#[test]
fn test_record_encode_matches_free_function() {
    let record = Record::new("k", "v=w");
    assert_eq!(record.encode(), encode("k", "v=w"));
}

#[test]
fn test_encode_decode_roundtrip() {
    let pairs = [
        ("k", "v"),
        ("user:42", "{\"name\":\"x\"}"),
        ("equation", "a=b=c"),
        ("ключ", "значение ✓"),
        ("spaces in key", "  padded value  "),
    ];

    for (key, value) in pairs {
        validate(key, value).unwrap();
        let bytes = encode(key, value);
        let (records, remainder) = scan(&bytes);

        assert_eq!(records, vec![Record::new(key, value)]);
        assert!(remainder.is_empty());
    }
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_decode_splits_on_first_separator() {
    let record = decode(b"a=b=c").unwrap();
    assert_eq!(record.key, "a");
    assert_eq!(record.value, "b=c");
}

#[test]
fn test_decode_without_separator_is_malformed() {
    assert_eq!(decode(b"justtext"), None);
    assert_eq!(decode(b""), None);
}

#[test]
fn test_decode_empty_key_is_malformed() {
    assert_eq!(decode(b"=value"), None);
}

#[test]
fn test_decode_empty_value_is_accepted() {
    assert_eq!(decode(b"key="), Some(Record::new("key", "")));
}

#[test]
fn test_decode_invalid_utf8_is_malformed() {
    assert_eq!(decode(b"key=\xff\xfe"), None);
    assert_eq!(decode(b"\xc3=value"), None);
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_validate_accepts_separator_in_value() {
    assert!(validate("k", "a=b").is_ok());
}

#[test]
fn test_validate_rejects_bad_input() {
    let cases = [
        ("", "v"),
        ("k", ""),
        ("k\n", "v"),
        ("k", "v\nx=y"),
        ("a=b", "v"),
    ];

    for (key, value) in cases {
        let err = validate(key, value).unwrap_err();
        assert!(
            matches!(err, KvError::InvalidRecord(_)),
            "expected InvalidRecord for {:?}={:?}, got {:?}",
            key,
            value,
            err
        );
    }
}

// =============================================================================
// Scan Tests
// =============================================================================

#[test]
fn test_scan_empty_buffer() {
    let (records, remainder) = scan(b"");
    assert!(records.is_empty());
    assert!(remainder.is_empty());
}

#[test]
fn test_scan_complete_records_only() {
    let (records, remainder) = scan(b"a=1\nb=2\n");
    assert_eq!(records, vec![Record::new("a", "1"), Record::new("b", "2")]);
    assert!(remainder.is_empty());
}

#[test]
fn test_scan_returns_partial_tail_undecoded() {
    let (records, remainder) = scan(b"b=3\nc=4");
    assert_eq!(records, vec![Record::new("b", "3")]);
    assert_eq!(remainder, b"c=4");
}

#[test]
fn test_scan_without_terminator_returns_everything_as_remainder() {
    let (records, remainder) = scan(b"key=val");
    assert!(records.is_empty());
    assert_eq!(remainder, b"key=val");
}

#[test]
fn test_scan_skips_malformed_lines() {
    let (records, remainder) = scan(b"a=1\ngarbage\n\nb=2\n");
    assert_eq!(records, vec![Record::new("a", "1"), Record::new("b", "2")]);
    assert!(remainder.is_empty());
}

#[test]
fn test_scan_keeps_duplicate_keys_in_order() {
    let (records, _) = scan(b"a=1\na=2\n");
    assert_eq!(records, vec![Record::new("a", "1"), Record::new("a", "2")]);
}

// =============================================================================
// Incremental Scanner Tests
// =============================================================================

#[test]
fn test_scanner_carries_partial_record_across_feeds() {
    let mut scanner = RecordScanner::new();

    assert!(scanner.feed(b"ke").is_empty());
    assert_eq!(scanner.pending(), b"ke");

    assert!(scanner.feed(b"y=va").is_empty());
    assert_eq!(scanner.pending(), b"key=va");

    let records = scanner.feed(b"lue\nnext=");
    assert_eq!(records, vec![Record::new("key", "value")]);
    assert_eq!(scanner.pending(), b"next=");
}

#[test]
fn test_scanner_counts_malformed_lines() {
    let mut scanner = RecordScanner::new();
    scanner.feed(b"bad\n=nokey\ngood=1\n");
    assert_eq!(scanner.malformed(), 2);
}

#[test]
fn test_scanner_finish_reports_torn_bytes() {
    let mut scanner = RecordScanner::new();
    scanner.feed(b"a=1\nhalf=wri");
    assert_eq!(scanner.finish(), 8);

    let mut clean = RecordScanner::new();
    clean.feed(b"a=1\n");
    assert_eq!(clean.finish(), 0);
}

#[test]
fn test_scanner_chunk_size_independence() {
    let (expected_records, expected_pending, expected_malformed) =
        scan_in_chunks(LOG, LOG.len());

    assert_eq!(
        expected_records,
        vec![
            Record::new("a", "1"),
            Record::new("bb", "two"),
            Record::new("url", "http://x?q=1&r=2"),
            Record::new("a", "3"),
            Record::new("empty", ""),
        ]
    );
    assert_eq!(expected_pending, b"ccc=partial");
    assert_eq!(expected_malformed, 2);

    for chunk_size in [1, 2, 3, 7, 13, 100] {
        let (records, pending, malformed) = scan_in_chunks(LOG, chunk_size);
        assert_eq!(records, expected_records, "chunk size {}", chunk_size);
        assert_eq!(pending, expected_pending, "chunk size {}", chunk_size);
        assert_eq!(malformed, expected_malformed, "chunk size {}", chunk_size);
    }
}

#[test]
fn test_scanner_matches_one_shot_scan() {
    let (one_shot, remainder) = scan(LOG);
    let (chunked, pending, _) = scan_in_chunks(LOG, 5);

    assert_eq!(one_shot, chunked);
    assert_eq!(remainder, pending.as_slice());
}

#[test]
fn test_scanner_multibyte_char_split_across_chunks() {
    let bytes = encode("ключ", "значение");
    let (records, pending, _) = scan_in_chunks(&bytes, 1);

    assert_eq!(records, vec![Record::new("ключ", "значение")]);
    assert!(pending.is_empty());
}
