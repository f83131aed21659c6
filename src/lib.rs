//! Snapcache - an embeddable in-memory key-value cache
//!
//! Enforces size, time-to-live and time-to-idle limits, persists its
//! contents as debounced snapshots, and shrinks on memory warnings.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod persistence;
mod tasks;

pub use cache::{
    Cache, CacheEntry, CachePolicy, CacheStats, Lifecycle, MemoryCacheManager,
    MemoryCacheManagerBuilder, MemoryLevelCacheDecorator,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{CacheError, SnapshotError};
pub use persistence::{JsonSerializer, SnapshotFileCache, SnapshotPersistentCache};
