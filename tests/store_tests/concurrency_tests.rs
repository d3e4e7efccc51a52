//! Concurrency tests for Store
//!
//! These tests verify:
//! - Concurrent sets on distinct keys all survive a clean shutdown
//! - Concurrent sets on one key leave the index matching the log
//! - Readers run alongside writers

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tempfile::TempDir;
use walkv::config::Config;
use walkv::store::Store;

const THREADS: usize = 8;
const WRITES_PER_THREAD: usize = 250;

fn test_config(dir: &TempDir) -> Config {
    Config::builder()
        .wal_path(dir.path().join("wal.log"))
        .flush_interval(Duration::from_millis(5))
        .build()
}

#[test]
fn test_concurrent_sets_survive_cold_recovery() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(test_config(&temp_dir)).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..WRITES_PER_THREAD {
                    store
                        .set(&format!("thread{}_key{}", t, i), &format!("v{}", i))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    store.shutdown().unwrap();
    let expected = store.snapshot();
    drop(store);

    let recovered = Store::open(test_config(&temp_dir)).unwrap();

    assert_eq!(recovered.len(), THREADS * WRITES_PER_THREAD);
    assert_eq!(recovered.snapshot(), expected);
}

#[test]
fn test_concurrent_sets_same_key_index_matches_log() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(test_config(&temp_dir)).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..WRITES_PER_THREAD {
                    store.set("shared", &format!("{}-{}", t, i)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    let in_memory = store.get("shared").unwrap();
    store.shutdown().unwrap();
    drop(store);

    let recovered = Store::open(test_config(&temp_dir)).unwrap();

    assert_eq!(recovered.get("shared").unwrap(), in_memory);
    assert_eq!(
        recovered.last_recovery().unwrap().records_recovered,
        (THREADS * WRITES_PER_THREAD) as u64
    );
}

#[test]
fn test_readers_alongside_writers() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(test_config(&temp_dir)).unwrap());
    store.set("stable", "value").unwrap();

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..500 {
                store.set(&format!("k{}", i), "x").unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..500 {
                    assert_eq!(store.get("stable").unwrap(), "value");
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(store.len(), 501);
    store.shutdown().unwrap();
}
