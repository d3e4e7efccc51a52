//! In-memory index
//!
//! Flat key → value map, the only thing reads consult. Rebuilt from the WAL
//! on every startup and never persisted on its own.
//!
//! Uses a BTreeMap behind an RwLock: many concurrent readers, one writer at
//! a time, and sorted iteration for dumps.

use std::collections::BTreeMap;

use parking_lot::RwLock;

/// Key → value map with last-write-wins inserts
#[derive(Debug, Default)]
pub struct Index {
    data: RwLock<BTreeMap<String, String>>,
}

impl Index {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value by key (read lock)
    pub fn get(&self, key: &str) -> Option<String> {
        self.data.read().get(key).cloned()
    }

    /// Insert or overwrite, returning the previous value (write lock)
    pub fn insert(&self, key: String, value: String) -> Option<String> {
        self.data.write().insert(key, value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.data.write().clear();
    }

    /// Sorted copy of the current contents
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.data.read().clone()
    }
}
