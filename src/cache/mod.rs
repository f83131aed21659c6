//! Cache Module
//!
//! Provides the in-memory cache manager with size, TTL and TTI policies,
//! debounced snapshot persistence, and memory-pressure handling.

mod builder;
mod entry;
pub(crate) mod manager;
mod ordered;
mod policy;
mod pressure;
mod stats;


use std::hash::Hash;

use async_trait::async_trait;

// Re-export public types
pub use builder::{MemoryCacheManagerBuilder, DEFAULT_SAVE_FREQUENCY};
pub use entry::CacheEntry;
pub use manager::{Lifecycle, MemoryCacheManager};
pub use ordered::{OrderedStore, DEFAULT_INITIAL_CAPACITY};
pub use policy::{CachePolicy, CachePolicyBuilder};
pub use pressure::{
    ManualMemoryLevelNotifier, MemoryLevel, MemoryLevelCacheDecorator, MemoryLevelCallbacks,
    MemoryLevelNotifier,
};
pub use stats::CacheStats;

// == Bounds ==
/// Everything a cache key must be.
pub trait CacheKey: Clone + Eq + Hash + Send + Sync + 'static {}

impl<T> CacheKey for T where T: Clone + Eq + Hash + Send + Sync + 'static {}

/// Everything a cached value must be.
pub trait CacheValue: Clone + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Clone + Send + Sync + 'static {}

// == Cache Trait ==
/// A cache with operations to add, update, retrieve, and remove entries.
///
/// None of these fail: a miss, an expiry or an eviction is an ordinary outcome.
#[async_trait]
pub trait Cache<K, V>: Send + Sync {
    /// Returns the value for `key`, or `None` if absent or expired.
    async fn get(&self, key: &K) -> Option<V>;

    /// Associates `key` with `value`, overwriting any previous value.
    async fn put(&self, key: K, value: V);

    /// Inserts every pair in order; a later duplicate key wins.
    async fn put_all(&self, pairs: Vec<(K, V)>);

    /// Removes the entry for `key` if there is one.
    async fn remove(&self, key: &K);

    /// Removes every entry.
    async fn clear(&self);
}
