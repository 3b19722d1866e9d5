//! Write-Behind Cache
//!
//! Writes land in the local store and are marked dirty; a background task
//! owned by the cache drains the dirty set every `flush_interval` and sends
//! one batched upsert to the backing store.
//!
//! # Durability window
//!
//! A dirty key whose entry is gone by the time the flush runs (evicted on an
//! expired read, or cleared) is dropped from the batch and its write is lost.
//! Keep `flush_interval` shorter than the TTL to make this unlikely; it can
//! never be ruled out.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::DEFAULT_OPERATION_TIMEOUT;
use crate::backing::{with_timeout, BackingStore};
use crate::cache::{CacheStats, Store, TtlStore};
use crate::error::Result;
use crate::tasks::{spawn_flush_task, FlushTask};

/// State shared between the cache handle and its flush task.
pub(crate) struct WriteBehindShared<V, S> {
    store: RwLock<S>,
    dirty: Mutex<HashSet<String>>,
    /// Held for the whole of a flush so flushes never overlap
    flush_guard: Mutex<()>,
    backing: Arc<dyn BackingStore<V>>,
    timeout: Duration,
    destroyed: AtomicBool,
}

impl<V, S> WriteBehindShared<V, S>
where
    V: Clone + Send + Sync + 'static,
    S: Store<V>,
{
    // == Flush ==
    /// Drains the dirty set and writes the current values in one batch.
    ///
    /// Returns the number of entries written. On failure every key of the
    /// batch goes back into the dirty set for the next cycle.
    pub(crate) async fn flush(&self) -> Result<usize> {
        let _flushing = self.flush_guard.lock().await;
        if self.destroyed.load(Ordering::SeqCst) {
            return Ok(0);
        }

        let drained: Vec<String> = self.dirty.lock().await.drain().collect();
        if drained.is_empty() {
            return Ok(0);
        }

        let batch: Vec<(String, V)> = {
            let store = self.store.read().await;
            drained
                .iter()
                .filter_map(|key| store.peek(key).map(|value| (key.clone(), value)))
                .collect()
        };

        let lost = drained.len() - batch.len();
        if lost > 0 {
            warn!(lost, "dirty entries removed before flush; their writes are dropped");
        }
        if batch.is_empty() {
            return Ok(0);
        }

        let keys: Vec<String> = batch.iter().map(|(key, _)| key.clone()).collect();
        let count = keys.len();

        match with_timeout(self.timeout, "bulk_upsert", self.backing.bulk_upsert(batch)).await {
            Ok(()) => {
                debug!(count, "write-behind batch flushed");
                Ok(count)
            }
            Err(err) => {
                self.dirty.lock().await.extend(keys);
                warn!(count, error = %err, "write-behind flush failed; keys marked dirty again");
                Err(err)
            }
        }
    }
}

pub struct WriteBehindCache<V, S = TtlStore<V>> {
    shared: Arc<WriteBehindShared<V, S>>,
    task: Mutex<Option<FlushTask>>,
}

impl<V> WriteBehindCache<V, TtlStore<V>>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a write-behind cache over a fresh TTL store and starts its
    /// flush task. Must be called from within a tokio runtime.
    pub fn new(backing: Arc<dyn BackingStore<V>>, ttl: Duration, flush_interval: Duration) -> Self {
        if flush_interval >= ttl {
            warn!(
                flush_interval_ms = flush_interval.as_millis() as u64,
                ttl_ms = ttl.as_millis() as u64,
                "flush interval is not shorter than the TTL; dirty writes are likely to be lost"
            );
        }
        Self::with_store(
            TtlStore::new(ttl),
            backing,
            flush_interval,
            DEFAULT_OPERATION_TIMEOUT,
        )
    }
}

impl<V, S> WriteBehindCache<V, S>
where
    V: Clone + Send + Sync + 'static,
    S: Store<V> + 'static,
{
    /// Creates a write-behind cache over `store` and starts its flush task.
    ///
    /// `timeout` bounds every backing-store call, including the batched
    /// upsert.
    pub fn with_store(
        store: S,
        backing: Arc<dyn BackingStore<V>>,
        flush_interval: Duration,
        timeout: Duration,
    ) -> Self {
        let shared = Arc::new(WriteBehindShared {
            store: RwLock::new(store),
            dirty: Mutex::new(HashSet::new()),
            flush_guard: Mutex::new(()),
            backing,
            timeout,
            destroyed: AtomicBool::new(false),
        });

        let shutdown = CancellationToken::new();
        let handle = spawn_flush_task(shared.clone(), flush_interval, shutdown.clone());

        Self {
            shared,
            task: Mutex::new(Some(FlushTask::new(shutdown, handle))),
        }
    }

    // == Get ==
    /// Reads from the local store, reading through to the backing store on a
    /// miss. Values read through are cached but not marked dirty.
    ///
    /// A `set` that lands while the backing read is in flight wins: the read
    /// returns the newer local value and caches nothing.
    pub async fn get(&self, key: &str) -> Result<Option<V>> {
        let cached = self.shared.store.write().await.get(key);
        if cached.is_some() {
            return Ok(cached);
        }

        let found = with_timeout(self.shared.timeout, "find", self.shared.backing.find(key)).await?;
        let Some(value) = found else {
            return Ok(None);
        };

        let mut store = self.shared.store.write().await;
        if let Some(current) = store.peek(key) {
            return Ok(Some(current));
        }
        if self.shared.dirty.lock().await.contains(key) {
            // Dropped locally before its flush; serve the backing copy uncached
            return Ok(Some(value));
        }
        store.set(key.to_string(), value.clone());
        Ok(Some(value))
    }

    // == Set ==
    /// Updates the local store and marks the key dirty. Never waits on the
    /// backing store.
    pub async fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        self.shared.store.write().await.set(key.clone(), value);
        self.shared.dirty.lock().await.insert(key);
    }

    /// Runs a flush now, serialized with the periodic one.
    ///
    /// After [`destroy`](Self::destroy) this is a no-op.
    pub async fn flush(&self) -> Result<usize> {
        self.shared.flush().await
    }

    /// Number of keys waiting for the next flush.
    pub async fn pending(&self) -> usize {
        self.shared.dirty.lock().await.len()
    }

    /// Drops the local entry. A pending dirty write for it is lost.
    pub async fn delete(&self, key: &str) -> bool {
        self.shared.store.write().await.delete(key)
    }

    /// Empties the local store. Pending dirty writes are lost.
    pub async fn clear(&self) -> usize {
        self.shared.store.write().await.clear()
    }

    pub async fn stats(&self) -> CacheStats {
        self.shared.store.read().await.stats()
    }

    pub async fn hit_ratio(&self) -> f64 {
        self.shared.store.read().await.hit_ratio()
    }

    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    // == Destroy ==
    /// Stops the flush task and waits for it to exit.
    ///
    /// Once this returns no flush runs again, periodic or manual. Pending
    /// dirty keys are not flushed; call [`flush`](Self::flush) first when
    /// they matter. Dropping the cache also stops the task.
    pub async fn destroy(&self) {
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            task.stop().await;
        }
        // Waits out a manual flush still in progress
        let _flushing = self.shared.flush_guard.lock().await;
        self.shared.destroyed.store(true, Ordering::SeqCst);
        info!("write-behind cache destroyed");
    }
}
