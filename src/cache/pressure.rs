//! Memory Pressure Module
//!
//! Lets a host environment's memory warnings shrink a cache: a low-memory
//! signal purges expired entries, a critical one clears everything.

use std::fmt;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::cache::manager::ManagerInner;
use crate::cache::{Cache, CacheKey, CacheValue, MemoryCacheManager};

/// Severity of a memory warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryLevel {
    Low,
    Critical,
}

/// Receives memory warnings. Implementations must not block.
pub trait MemoryLevelCallbacks: Send + Sync {
    fn on_low_memory(&self);

    fn on_critical_memory(&self);
}

/// A source of memory warnings.
///
/// Holds at most one set of callbacks; setting new ones replaces the old,
/// and `None` detaches.
pub trait MemoryLevelNotifier: Send + Sync {
    fn set_callbacks(&self, callbacks: Option<Arc<dyn MemoryLevelCallbacks>>);
}

// == Manual Notifier ==
/// A notifier driven by explicit calls to [`signal`](Self::signal).
///
/// Bridges whatever the host uses to detect memory pressure, and drives
/// the decorator in tests.
#[derive(Default)]
pub struct ManualMemoryLevelNotifier {
    callbacks: Mutex<Option<Arc<dyn MemoryLevelCallbacks>>>,
}

impl ManualMemoryLevelNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers a warning to the attached callbacks, if any.
    pub fn signal(&self, level: MemoryLevel) {
        // clone out so callbacks never run under our lock
        let callbacks = self.callbacks.lock().clone();
        let Some(callbacks) = callbacks else {
            debug!("Memory level {:?} signalled with no callbacks attached", level);
            return;
        };
        match level {
            MemoryLevel::Low => callbacks.on_low_memory(),
            MemoryLevel::Critical => callbacks.on_critical_memory(),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.callbacks.lock().is_some()
    }
}

impl MemoryLevelNotifier for ManualMemoryLevelNotifier {
    fn set_callbacks(&self, callbacks: Option<Arc<dyn MemoryLevelCallbacks>>) {
        *self.callbacks.lock() = callbacks;
    }
}

impl fmt::Debug for ManualMemoryLevelNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualMemoryLevelNotifier")
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Callbacks registered by the decorator. Holds the manager weakly so a
/// long-lived notifier never keeps a dropped cache alive.
struct TrimOnPressure<K, V> {
    manager: Weak<ManagerInner<K, V>>,
    runtime: Handle,
}

impl<K: CacheKey, V: CacheValue> MemoryLevelCallbacks for TrimOnPressure<K, V> {
    fn on_low_memory(&self) {
        let Some(manager) = self.manager.upgrade() else {
            return;
        };
        self.runtime.spawn(async move {
            manager.trim_memory().await;
            info!("Memory has reached a low level causing the cache to remove all expired entries");
        });
    }

    fn on_critical_memory(&self) {
        let Some(manager) = self.manager.upgrade() else {
            return;
        };
        self.runtime.spawn(async move {
            manager.clear().await;
            warn!("Memory has reached a critical level causing the cache to be cleared");
        });
    }
}

// == Memory Level Cache Decorator ==
/// Wraps a [`MemoryCacheManager`] and shrinks it on memory warnings.
///
/// Cache operations pass straight through. The decorator registers itself
/// with the notifier on construction and detaches once the manager's
/// shutdown token is cancelled.
pub struct MemoryLevelCacheDecorator<K, V> {
    manager: MemoryCacheManager<K, V>,
    notifier: Arc<dyn MemoryLevelNotifier>,
}

impl<K: CacheKey, V: CacheValue> MemoryLevelCacheDecorator<K, V> {
    pub fn new(manager: MemoryCacheManager<K, V>, notifier: Arc<dyn MemoryLevelNotifier>) -> Self {
        let callbacks: Arc<dyn MemoryLevelCallbacks> = Arc::new(TrimOnPressure {
            manager: manager.downgrade(),
            runtime: manager.runtime().clone(),
        });
        notifier.set_callbacks(Some(callbacks));

        let shutdown = manager.shutdown_token();
        let detach = Arc::clone(&notifier);
        manager.runtime().spawn(async move {
            shutdown.cancelled().await;
            detach.set_callbacks(None);
            debug!("Memory level callbacks detached");
        });

        Self { manager, notifier }
    }

    /// The wrapped manager.
    pub fn manager(&self) -> &MemoryCacheManager<K, V> {
        &self.manager
    }

    pub fn notifier(&self) -> &Arc<dyn MemoryLevelNotifier> {
        &self.notifier
    }
}

#[async_trait]
impl<K: CacheKey, V: CacheValue> Cache<K, V> for MemoryLevelCacheDecorator<K, V> {
    async fn get(&self, key: &K) -> Option<V> {
        self.manager.get(key).await
    }

    async fn put(&self, key: K, value: V) {
        self.manager.put(key, value).await;
    }

    async fn put_all(&self, pairs: Vec<(K, V)>) {
        self.manager.put_all(pairs).await;
    }

    async fn remove(&self, key: &K) {
        self.manager.remove(key).await;
    }

    async fn clear(&self) {
        self.manager.clear().await;
    }
}
