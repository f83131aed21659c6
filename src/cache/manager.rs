//! Memory Cache Manager
//!
//! The thread-safe cache engine: owns the ordered store, applies the cache
//! policy on every read and write, and signals the snapshot task whenever
//! the contents change.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::sync::{watch, Mutex, MutexGuard, OnceCell};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn};

use crate::cache::policy::TemporalPolicy;
use crate::cache::{
    Cache, CacheEntry, CacheKey, CachePolicy, CacheStats, CacheValue, OrderedStore,
    DEFAULT_INITIAL_CAPACITY,
};
use crate::clock::Clock;
use crate::persistence::SnapshotPersistentCache;
use crate::tasks::spawn_snapshot_task;

/// The persistence backend as the manager sees it.
pub type SharedSnapshot<K, V> = Arc<dyn SnapshotPersistentCache<Vec<CacheEntry<K, V>>>>;

// == Lifecycle ==
/// Where a manager is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Loading the snapshot; operations wait
    Initializing,
    /// Serving reads and writes
    Ready,
    /// Shutdown requested; the final snapshot save is in flight
    Draining,
    /// Final save done; later changes stay in memory only
    Closed,
}

/// Everything guarded by the manager's lock.
struct Contents<K, V> {
    store: OrderedStore<K, V>,
    stats: CacheStats,
}

/// Inputs assembled by the builder.
pub(crate) struct ManagerParts<K, V> {
    pub(crate) policy: CachePolicy,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) snapshot: Option<SharedSnapshot<K, V>>,
    pub(crate) save_frequency: Duration,
    pub(crate) shutdown: CancellationToken,
    pub(crate) owner: Option<DropGuard>,
    pub(crate) runtime: Handle,
}

// == Manager Inner ==
/// Shared state behind every handle and background task.
pub(crate) struct ManagerInner<K, V> {
    policy: CachePolicy,
    temporal: Option<TemporalPolicy>,
    clock: Arc<dyn Clock>,
    snapshot: Option<SharedSnapshot<K, V>>,
    contents: OnceCell<Mutex<Contents<K, V>>>,
    changes: watch::Sender<()>,
    lifecycle: watch::Sender<Lifecycle>,
    shutdown: CancellationToken,
    runtime: Handle,
}

impl<K: CacheKey, V: CacheValue> ManagerInner<K, V> {
    // == Initialization ==
    /// Waits until the snapshot has been loaded, loading it if nobody has yet.
    async fn ready(&self) -> &Mutex<Contents<K, V>> {
        self.contents.get_or_init(|| self.load()).await
    }

    /// Resolves once initialization has finished.
    pub(crate) async fn wait_ready(&self) {
        self.ready().await;
    }

    async fn lock(&self) -> MutexGuard<'_, Contents<K, V>> {
        self.ready().await.lock().await
    }

    async fn load(&self) -> Mutex<Contents<K, V>> {
        let mut entries = match &self.snapshot {
            None => Vec::new(),
            Some(snapshot) => match snapshot.read().await {
                Ok(entries) => entries.unwrap_or_default(),
                Err(err) => {
                    warn!("Failed to read cache snapshot, starting empty: {}", err);
                    Vec::new()
                }
            },
        };

        // the policy may differ from the one the snapshot was written under
        entries.sort_by_key(|entry| self.policy.sort_key(entry));

        let loaded = entries.len();
        let capacity = loaded.max(DEFAULT_INITIAL_CAPACITY);
        let mut contents = Contents {
            store: OrderedStore::with_capacity(capacity, self.policy.has_tti_policy()),
            stats: CacheStats::new(),
        };
        contents
            .store
            .put_all(entries.into_iter().map(|entry| (entry.key.clone(), entry)));

        let now = self.clock.now_millis();
        if self.trim_to_size(&mut contents, now) > 0 {
            self.notify_change();
        }

        info!(
            "Cache initialized: {} entries ({} loaded from snapshot)",
            contents.store.len(),
            loaded
        );
        self.set_lifecycle(Lifecycle::Ready);
        Mutex::new(contents)
    }

    // == Operations ==
    async fn get(&self, key: &K) -> Option<V> {
        let mut guard = self.lock().await;
        let contents = &mut *guard;
        let now = self.clock.now_millis();

        let Some(entry) = contents.store.get(key).cloned() else {
            contents.stats.record_miss();
            return None;
        };

        if self.is_expired(&entry, now) {
            contents.store.remove(key);
            contents.stats.record_expirations(1);
            contents.stats.record_miss();
            self.notify_change();
            return None;
        }

        let value = entry.value.clone();
        contents.store.put(key.clone(), entry.accessed_at(now));
        contents.stats.record_hit();
        // a read extends the entry's lifetime, which is worth persisting
        self.notify_change();
        Some(value)
    }

    async fn put(&self, key: K, value: V) {
        let mut guard = self.lock().await;
        self.insert_or_update(&mut guard, key, value);
        self.notify_change();
    }

    async fn put_all(&self, pairs: Vec<(K, V)>) {
        let mut guard = self.lock().await;
        for (key, value) in pairs {
            self.insert_or_update(&mut guard, key, value);
        }
        self.notify_change();
    }

    pub(crate) async fn remove(&self, key: &K) {
        let mut guard = self.lock().await;
        guard.store.remove(key);
        self.notify_change();
    }

    pub(crate) async fn clear(&self) {
        let mut guard = self.lock().await;
        guard.store.clear();
        self.notify_change();
    }

    /// Purges expired entries from the head without enforcing the size limit.
    pub(crate) async fn trim_memory(&self) {
        let mut guard = self.lock().await;
        let now = self.clock.now_millis();
        let expired = self.apply_temporal_policy(&mut guard, now);
        debug!("Trimmed {} expired entries from cache", expired);
        self.notify_change();
    }

    fn insert_or_update(&self, contents: &mut Contents<K, V>, key: K, value: V) {
        // an overwrite alone would keep the key's old position, so remove it
        // first; this also restarts the creation date
        contents.store.remove(&key);
        let now = self.clock.now_millis();
        contents
            .store
            .put(key.clone(), CacheEntry::new(key, value, now));
        self.trim_to_size(contents, now);
    }

    // == Policy Enforcement ==
    /// Enforces the max size, preferring expired entries over live ones.
    ///
    /// Returns the number of entries removed for any reason.
    fn trim_to_size(&self, contents: &mut Contents<K, V>, now: i64) -> usize {
        let Some(max_size) = self.policy.max_size() else {
            return 0;
        };
        if contents.store.len() <= max_size {
            return 0;
        }

        let expired = self.apply_temporal_policy(contents, now);
        let over_limit = contents.store.len().saturating_sub(max_size);
        let evicted = if over_limit > 0 {
            contents.store.remove_front(over_limit)
        } else {
            0
        };
        contents.stats.record_evictions(evicted);

        debug!(
            "Trimmed cache to size {}: {} expired, {} evicted",
            max_size, expired, evicted
        );
        expired + evicted
    }

    /// Removes expired entries from the head, stopping at the first live one.
    fn apply_temporal_policy(&self, contents: &mut Contents<K, V>, now: i64) -> usize {
        let Some(temporal) = self.temporal else {
            return 0;
        };
        let expired = contents
            .store
            .remove_front_while(|entry| temporal.is_expired(entry, now));
        contents.stats.record_expirations(expired);
        expired
    }

    fn is_expired(&self, entry: &CacheEntry<K, V>, now: i64) -> bool {
        self.temporal
            .is_some_and(|temporal| temporal.is_expired(entry, now))
    }

    fn notify_change(&self) {
        self.changes.send_replace(());
    }

    // == Persistence ==
    pub(crate) fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Hands the current contents to the snapshot backend.
    pub(crate) async fn save_snapshot(&self) {
        let Some(snapshot) = &self.snapshot else {
            return;
        };

        let entries = self.lock().await.store.entries();
        let count = entries.len();
        let result = snapshot.save(Some(entries)).await;

        let mut guard = self.lock().await;
        match result {
            Ok(()) => {
                debug!("Saved cache snapshot with {} entries", count);
                guard.stats.record_snapshot_save();
            }
            Err(err) => {
                error!("Failed to save cache snapshot: {}", err);
                guard.stats.record_snapshot_failure();
            }
        }
    }

    // == Lifecycle ==
    pub(crate) fn set_lifecycle(&self, state: Lifecycle) {
        self.lifecycle.send_replace(state);
        info!("Cache lifecycle: {:?}", state);
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub(crate) fn runtime(&self) -> &Handle {
        &self.runtime
    }
}

// == Memory Cache Manager ==
/// A thread-safe cache that enforces a [`CachePolicy`] and periodically
/// persists its contents.
///
/// The manager is usable as soon as it is built; the first operations wait
/// for the snapshot to finish loading. Operations are serialized by a single
/// async lock, so no two reads or writes ever interleave.
///
/// Once the shutdown token is cancelled a final snapshot is saved and
/// nothing after that point is persisted.
pub struct MemoryCacheManager<K, V> {
    inner: Arc<ManagerInner<K, V>>,
    _owner: Option<Arc<DropGuard>>,
}

impl<K, V> Clone for MemoryCacheManager<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _owner: self._owner.clone(),
        }
    }
}

impl<K: CacheKey, V: CacheValue> MemoryCacheManager<K, V> {
    // == Constructor ==
    /// Starts loading and the background snapshot task.
    pub(crate) fn start(parts: ManagerParts<K, V>) -> Self {
        info!(
            "Initializing cache manager (max_size: {:?}, ttl: {:?}, tti: {:?}, persistent: {})",
            parts.policy.max_size(),
            parts.policy.entry_ttl(),
            parts.policy.entry_tti(),
            parts.snapshot.is_some()
        );

        let (changes, change_rx) = watch::channel(());
        let (lifecycle, _) = watch::channel(Lifecycle::Initializing);
        let inner = Arc::new(ManagerInner {
            temporal: parts.policy.temporal_policy(),
            policy: parts.policy,
            clock: parts.clock,
            snapshot: parts.snapshot,
            contents: OnceCell::new(),
            changes,
            lifecycle,
            shutdown: parts.shutdown,
            runtime: parts.runtime,
        });

        let loader = Arc::clone(&inner);
        inner.runtime.spawn(async move {
            loader.wait_ready().await;
        });
        spawn_snapshot_task(Arc::clone(&inner), change_rx, parts.save_frequency);

        Self {
            inner,
            _owner: parts.owner.map(Arc::new),
        }
    }

    /// Purges expired entries, leaving live entries alone even when the
    /// cache is over its size limit.
    pub async fn trim_memory(&self) {
        self.inner.trim_memory().await;
    }

    /// Number of entries currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.store.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Copies the current entries out in eviction order, oldest first.
    pub async fn entries(&self) -> Vec<CacheEntry<K, V>> {
        self.inner.lock().await.store.entries()
    }

    pub async fn stats(&self) -> CacheStats {
        let guard = self.inner.lock().await;
        let mut stats = guard.stats.clone();
        stats.set_total_entries(guard.store.len());
        stats
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.inner.policy
    }

    pub fn state(&self) -> Lifecycle {
        *self.inner.lifecycle.borrow()
    }

    /// Resolves once the final snapshot has been saved after shutdown.
    pub async fn closed(&self) {
        let mut lifecycle = self.inner.lifecycle.subscribe();
        // the sender lives in `inner`, which we hold, so this cannot fail
        let _ = lifecycle
            .wait_for(|state| *state == Lifecycle::Closed)
            .await;
    }

    /// The token whose cancellation ends this manager's persistence.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown_token()
    }

    pub(crate) fn downgrade(&self) -> Weak<ManagerInner<K, V>> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn runtime(&self) -> &Handle {
        self.inner.runtime()
    }
}

#[async_trait]
impl<K: CacheKey, V: CacheValue> Cache<K, V> for MemoryCacheManager<K, V> {
    async fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key).await
    }

    async fn put(&self, key: K, value: V) {
        self.inner.put(key, value).await;
    }

    async fn put_all(&self, pairs: Vec<(K, V)>) {
        self.inner.put_all(pairs).await;
    }

    async fn remove(&self, key: &K) {
        self.inner.remove(key).await;
    }

    async fn clear(&self) {
        self.inner.clear().await;
    }
}
