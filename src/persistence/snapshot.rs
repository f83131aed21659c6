//! Snapshot Persistent Cache
//!
//! The narrow read-everything / save-everything boundary between the cache
//! manager and durable storage.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::SnapshotError;

// == Snapshot Persistent Cache Trait ==
/// A store that persists a point-in-time snapshot of some data.
///
/// Implementations need not be safe for concurrent callers; the cache
/// manager serializes its own reads and saves.
#[async_trait]
pub trait SnapshotPersistentCache<T>: Send + Sync {
    /// Returns the data last saved, or `None` when nothing was saved.
    async fn read(&self) -> Result<Option<T>, SnapshotError>;

    /// Replaces any previously saved data. Saving `None` clears it.
    async fn save(&self, data: Option<T>) -> Result<(), SnapshotError>;
}

// == In-Memory Snapshot Cache ==
/// A snapshot store that keeps the last saved value in memory.
///
/// Useful for tests and for caches that only need to survive a rebuild of
/// the manager within one process.
#[derive(Debug)]
pub struct InMemorySnapshotCache<T> {
    data: Mutex<Option<T>>,
    save_count: AtomicUsize,
}

impl<T> InMemorySnapshotCache<T> {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(None),
            save_count: AtomicUsize::new(0),
        }
    }

    /// Creates a store that already holds `data`, as if saved earlier.
    pub fn with_data(data: T) -> Self {
        Self {
            data: Mutex::new(Some(data)),
            save_count: AtomicUsize::new(0),
        }
    }

    /// Number of times `save` has been called.
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }
}

impl<T: Clone> InMemorySnapshotCache<T> {
    /// Returns the currently held data without going through the trait.
    pub fn current(&self) -> Option<T> {
        self.data.lock().clone()
    }
}

impl<T> Default for InMemorySnapshotCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> SnapshotPersistentCache<T> for InMemorySnapshotCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn read(&self) -> Result<Option<T>, SnapshotError> {
        Ok(self.data.lock().clone())
    }

    async fn save(&self, data: Option<T>) -> Result<(), SnapshotError> {
        *self.data.lock() = data;
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
