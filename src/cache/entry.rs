//! Cache Entry Module
//!
//! Defines the immutable record stored for every key, including the
//! timestamps the temporal policies are evaluated against.

use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A key/value pair plus the metadata needed to expire it.
///
/// Entries are never mutated in place; reads and writes produce a new entry
/// that replaces the old one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry<K, V> {
    /// The key this entry is stored under
    pub key: K,
    /// The stored value
    pub value: V,
    /// When the entry was written (Unix milliseconds)
    pub creation_date: i64,
    /// When the entry was last written or read (Unix milliseconds)
    pub last_access_date: i64,
}

impl<K, V> CacheEntry<K, V> {
    // == Constructor ==
    /// Creates a fresh entry whose creation and access times are both `now`.
    pub fn new(key: K, value: V, now: i64) -> Self {
        Self {
            key,
            value,
            creation_date: now,
            last_access_date: now,
        }
    }
}

impl<K: Clone, V: Clone> CacheEntry<K, V> {
    // == Accessed At ==
    /// Returns a copy of this entry with `last_access_date` moved to `now`.
    pub fn accessed_at(&self, now: i64) -> Self {
        Self {
            last_access_date: now,
            ..self.clone()
        }
    }
}
