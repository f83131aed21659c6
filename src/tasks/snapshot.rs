//! Snapshot Task
//!
//! Background task that persists the cache contents after changes, at most
//! once per save frequency, and saves one last time on shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::manager::ManagerInner;
use crate::cache::{CacheKey, CacheValue, Lifecycle};

/// Spawns the task that saves snapshots for one manager.
///
/// After initialization the task waits for a change signal, then sleeps for
/// `save_frequency` so that a burst of changes collapses into one save of
/// the latest contents. Signals that arrive during the sleep are folded
/// into that save.
///
/// When the manager's shutdown token is cancelled, whatever the task is
/// doing is abandoned in favor of a final save. Managers without a snapshot
/// backend still move through `Draining` to `Closed`.
pub(crate) fn spawn_snapshot_task<K: CacheKey, V: CacheValue>(
    inner: Arc<ManagerInner<K, V>>,
    mut changes: watch::Receiver<()>,
    save_frequency: Duration,
) -> JoinHandle<()> {
    let shutdown = inner.shutdown_token();
    let runtime = inner.runtime().clone();

    runtime.spawn(async move {
        inner.wait_ready().await;

        if inner.has_snapshot() {
            info!(
                "Starting snapshot task with save frequency of {:?}",
                save_frequency
            );

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }

                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(save_frequency) => {}
                }

                changes.borrow_and_update();
                inner.save_snapshot().await;
            }
        } else {
            shutdown.cancelled().await;
        }

        inner.set_lifecycle(Lifecycle::Draining);
        inner.save_snapshot().await;
        inner.set_lifecycle(Lifecycle::Closed);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Cache, CacheEntry, MemoryCacheManagerBuilder};
    use crate::persistence::InMemorySnapshotCache;
    use tokio_util::sync::CancellationToken;

    type Entries = Vec<CacheEntry<String, u32>>;

    #[tokio::test(start_paused = true)]
    async fn test_idle_cache_is_never_saved_before_shutdown() {
        let snapshot = Arc::new(InMemorySnapshotCache::<Entries>::new());
        let shutdown = CancellationToken::new();
        let manager = MemoryCacheManagerBuilder::<String, u32>::new()
            .snapshot_persistent_cache(snapshot.clone())
            .shutdown_token(shutdown.clone())
            .build_manager()
            .unwrap();

        manager.len().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(snapshot.save_count(), 0);

        // the final save happens even without pending changes
        shutdown.cancel();
        manager.closed().await;
        assert_eq!(snapshot.save_count(), 1);
        assert_eq!(snapshot.current(), Some(Vec::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_wait_saves_latest_contents() {
        let snapshot = Arc::new(InMemorySnapshotCache::<Entries>::new());
        let shutdown = CancellationToken::new();
        let manager = MemoryCacheManagerBuilder::<String, u32>::new()
            .save_frequency(Duration::from_secs(30))
            .snapshot_persistent_cache(snapshot.clone())
            .shutdown_token(shutdown.clone())
            .build_manager()
            .unwrap();

        manager.put("a".to_string(), 1).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        manager.put("b".to_string(), 2).await;
        shutdown.cancel();
        manager.closed().await;

        assert_eq!(snapshot.save_count(), 1);
        assert_eq!(snapshot.current().map(|e| e.len()), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_save_separately() {
        let snapshot = Arc::new(InMemorySnapshotCache::<Entries>::new());
        let shutdown = CancellationToken::new();
        let manager = MemoryCacheManagerBuilder::<String, u32>::new()
            .save_frequency(Duration::from_secs(1))
            .snapshot_persistent_cache(snapshot.clone())
            .shutdown_token(shutdown.clone())
            .build_manager()
            .unwrap();

        manager.put("a".to_string(), 1).await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        manager.put("b".to_string(), 2).await;
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(snapshot.save_count(), 2);
        assert_eq!(manager.stats().await.snapshot_saves, 2);
    }
}
