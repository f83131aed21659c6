//! Cache Builder
//!
//! Assembles a [`MemoryCacheManager`] from optional collaborators, and
//! wraps it for memory-pressure handling when a notifier is supplied.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::cache::manager::{ManagerParts, SharedSnapshot};
use crate::cache::{
    Cache, CacheKey, CachePolicy, CacheValue, MemoryCacheManager, MemoryLevelCacheDecorator,
    MemoryLevelNotifier,
};
use crate::clock::{Clock, SystemClock};
use crate::error::{CacheError, Result};

/// How long the manager waits after a change before saving a snapshot.
pub const DEFAULT_SAVE_FREQUENCY: Duration = Duration::from_secs(5);

/// Builder for a [`MemoryCacheManager`].
///
/// Every setting is optional except that a snapshot persistent cache
/// requires a shutdown token, which is what triggers the final save.
/// Without a snapshot and without a token, the manager owns a token of its
/// own that is cancelled when the last handle is dropped.
pub struct MemoryCacheManagerBuilder<K, V> {
    cache_policy: CachePolicy,
    save_frequency: Duration,
    memory_level_notifier: Option<Arc<dyn MemoryLevelNotifier>>,
    runtime: Option<Handle>,
    shutdown: Option<CancellationToken>,
    snapshot: Option<SharedSnapshot<K, V>>,
    clock: Arc<dyn Clock>,
}

impl<K: CacheKey, V: CacheValue> MemoryCacheManagerBuilder<K, V> {
    pub fn new() -> Self {
        Self {
            cache_policy: CachePolicy::default(),
            save_frequency: DEFAULT_SAVE_FREQUENCY,
            memory_level_notifier: None,
            runtime: None,
            shutdown: None,
            snapshot: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Limits to enforce. Defaults to none.
    pub fn cache_policy(mut self, cache_policy: CachePolicy) -> Self {
        self.cache_policy = cache_policy;
        self
    }

    /// Debounce window for snapshot saves.
    pub fn save_frequency(mut self, save_frequency: Duration) -> Self {
        self.save_frequency = save_frequency;
        self
    }

    /// Source of memory warnings. Only honored by [`build`](Self::build).
    pub fn memory_level_notifier(mut self, notifier: Arc<dyn MemoryLevelNotifier>) -> Self {
        self.memory_level_notifier = Some(notifier);
        self
    }

    /// Runtime for background work. Defaults to the current runtime.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Token whose cancellation triggers the final snapshot save.
    pub fn shutdown_token(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Backend to load from at startup and save to after changes.
    pub fn snapshot_persistent_cache(mut self, snapshot: SharedSnapshot<K, V>) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Source of the current time. Defaults to the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Builds the cache, decorated for memory pressure if a notifier was set.
    pub fn build(mut self) -> Result<Arc<dyn Cache<K, V>>> {
        let notifier = self.memory_level_notifier.take();
        let manager = self.build_manager()?;

        if let Some(notifier) = notifier {
            return Ok(Arc::new(MemoryLevelCacheDecorator::new(manager, notifier)));
        }
        Ok(Arc::new(manager))
    }

    /// Builds the bare manager, ignoring any memory level notifier.
    pub fn build_manager(self) -> Result<MemoryCacheManager<K, V>> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|err| CacheError::NoRuntime(err.to_string()))?,
        };

        let (shutdown, owner) = match self.shutdown {
            Some(shutdown) => (shutdown, None),
            None if self.snapshot.is_some() => {
                return Err(CacheError::MissingCollaborator(
                    "shutdown_token is required when a snapshot persistent cache is set"
                        .to_string(),
                ));
            }
            None => {
                let shutdown = CancellationToken::new();
                let owner = shutdown.clone().drop_guard();
                (shutdown, Some(owner))
            }
        };

        Ok(MemoryCacheManager::start(ManagerParts {
            policy: self.cache_policy,
            clock: self.clock,
            snapshot: self.snapshot,
            save_frequency: self.save_frequency,
            shutdown,
            owner,
            runtime,
        }))
    }
}

impl<K: CacheKey, V: CacheValue> Default for MemoryCacheManagerBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
