//! Write-Through Cache
//!
//! Every write is committed to the backing store before the local entry is
//! touched, so a failed write never leaves the cache ahead of the store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use super::DEFAULT_OPERATION_TIMEOUT;
use crate::backing::{with_timeout, BackingStore};
use crate::cache::{CacheStats, Store, TtlStore};
use crate::error::Result;

pub struct WriteThroughCache<V, S = TtlStore<V>> {
    store: RwLock<S>,
    backing: Arc<dyn BackingStore<V>>,
    /// Serializes writers so local order matches backing-store order
    write_lock: Mutex<()>,
    timeout: Duration,
}

impl<V> WriteThroughCache<V, TtlStore<V>>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a write-through cache over a fresh TTL store.
    pub fn new(backing: Arc<dyn BackingStore<V>>, ttl: Duration) -> Self {
        Self::with_store(TtlStore::new(ttl), backing)
    }
}

impl<V, S> WriteThroughCache<V, S>
where
    V: Clone + Send + Sync + 'static,
    S: Store<V>,
{
    pub fn with_store(store: S, backing: Arc<dyn BackingStore<V>>) -> Self {
        Self {
            store: RwLock::new(store),
            backing,
            write_lock: Mutex::new(()),
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Bounds every backing-store call with `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    // == Get ==
    /// Reads from the local store, falling back to the backing store.
    ///
    /// A value found in the backing store populates the local store unless a
    /// concurrent `set` got there first. A backing-store miss is returned as
    /// `None` and caches nothing.
    pub async fn get(&self, key: &str) -> Result<Option<V>> {
        let cached = self.store.write().await.get(key);
        if cached.is_some() {
            return Ok(cached);
        }

        let found = with_timeout(self.timeout, "find", self.backing.find(key)).await?;
        let Some(value) = found else {
            return Ok(None);
        };

        // A write committed while the read was in flight is newer than `value`
        let _writer = self.write_lock.lock().await;
        let mut store = self.store.write().await;
        if let Some(current) = store.peek(key) {
            return Ok(Some(current));
        }
        debug!(key, "populating cache from backing store");
        store.set(key.to_string(), value.clone());
        Ok(Some(value))
    }

    // == Set ==
    /// Commits `value` to the backing store, then updates the local store.
    ///
    /// On failure the error is returned unchanged and the local store is left
    /// as it was.
    pub async fn set(&self, key: impl Into<String>, value: V) -> Result<()> {
        let key = key.into();
        let _writer = self.write_lock.lock().await;

        let upsert = self.backing.upsert(&key, &value);
        if let Err(err) = with_timeout(self.timeout, "upsert", upsert).await {
            warn!(key = %key, error = %err, "write-through upsert failed; cache left unchanged");
            return Err(err);
        }

        self.store.write().await.set(key, value);
        Ok(())
    }

    /// Drops the local entry only; the backing store keeps its copy.
    pub async fn delete(&self, key: &str) -> bool {
        self.store.write().await.delete(key)
    }

    pub async fn clear(&self) -> usize {
        self.store.write().await.clear()
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    pub async fn hit_ratio(&self) -> f64 {
        self.store.read().await.hit_ratio()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backing::MemoryBackingStore;
    use crate::error::CacheError;
    use async_trait::async_trait;

    /// Answers `find` from a snapshot taken before a slow return trip.
    struct SlowFind {
        inner: MemoryBackingStore<String>,
        delay: Duration,
    }

    #[async_trait]
    impl BackingStore<String> for SlowFind {
        async fn find(&self, key: &str) -> Result<Option<String>> {
            let found = self.inner.find(key).await;
            tokio::time::sleep(self.delay).await;
            found
        }

        async fn upsert(&self, key: &str, value: &String) -> Result<()> {
            self.inner.upsert(key, value).await
        }

        async fn bulk_upsert(&self, items: Vec<(String, String)>) -> Result<()> {
            self.inner.bulk_upsert(items).await
        }
    }

    fn setup() -> (Arc<MemoryBackingStore<String>>, WriteThroughCache<String>) {
        let backing = Arc::new(MemoryBackingStore::<String>::new());
        let cache = WriteThroughCache::new(backing.clone(), Duration::from_secs(60));
        (backing, cache)
    }

    #[tokio::test]
    async fn test_set_reaches_backing_store_first() {
        let (backing, cache) = setup();

        cache.set("user:1", "alice".to_string()).await.unwrap();

        assert_eq!(backing.document("user:1").await.as_deref(), Some("alice"));
        assert_eq!(cache.get("user:1").await.unwrap().as_deref(), Some("alice"));
        assert_eq!(backing.find_calls(), 0);
        assert_eq!(cache.stats().await.hits, 1);
    }

    #[tokio::test]
    async fn test_failed_upsert_leaves_cache_untouched() {
        let (backing, cache) = setup();

        cache.set("user:1", "alice".to_string()).await.unwrap();
        backing.set_fail_writes(true);

        let result = cache.set("user:1", "mallory".to_string()).await;
        assert!(matches!(result, Err(CacheError::Backend(_))));

        assert_eq!(cache.get("user:1").await.unwrap().as_deref(), Some("alice"));
        assert_eq!(backing.document("user:1").await.as_deref(), Some("alice"));
        assert_eq!(cache.stats().await.sets, 1);
    }

    #[tokio::test]
    async fn test_miss_reads_through_and_populates() {
        let (backing, cache) = setup();
        backing.seed("user:2", "bob".to_string()).await;

        assert_eq!(cache.get("user:2").await.unwrap().as_deref(), Some("bob"));
        assert_eq!(cache.get("user:2").await.unwrap().as_deref(), Some("bob"));

        let stats = cache.stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.sets, 1);
        assert_eq!(backing.find_calls(), 1);
        // Populating from a read never writes back
        assert_eq!(backing.upsert_calls(), 0);
    }

    #[tokio::test]
    async fn test_backing_miss_is_not_cached() {
        let (backing, cache) = setup();

        assert_eq!(cache.get("ghost").await.unwrap(), None);
        assert_eq!(cache.get("ghost").await.unwrap(), None);

        assert_eq!(backing.find_calls(), 2);
        assert_eq!(cache.stats().await.size, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_backing_store_times_out() {
        let backing = Arc::new(
            MemoryBackingStore::<String>::new().with_latency(Duration::from_secs(10)),
        );
        let cache = WriteThroughCache::new(backing.clone(), Duration::from_secs(60))
            .with_timeout(Duration::from_millis(100));

        let result = cache.set("k", "v".to_string()).await;
        assert!(matches!(result, Err(CacheError::Timeout(_))));
        assert_eq!(cache.stats().await.size, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_read_through_does_not_replace_newer_write() {
        let inner = MemoryBackingStore::<String>::new();
        inner.seed("k", "old".to_string()).await;
        let backing = Arc::new(SlowFind {
            inner,
            delay: Duration::from_millis(30),
        });
        let cache = Arc::new(WriteThroughCache::new(backing.clone(), Duration::from_secs(60)));

        let reader = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get("k").await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.set("k", "new".to_string()).await.unwrap();

        assert_eq!(reader.await.unwrap(), Ok(Some("new".to_string())));
        assert_eq!(cache.get("k").await, Ok(Some("new".to_string())));
        assert_eq!(backing.inner.document("k").await.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_delete_is_local_only() {
        let (backing, cache) = setup();

        cache.set("k", "v".to_string()).await.unwrap();
        assert!(cache.delete("k").await);

        assert_eq!(backing.document("k").await.as_deref(), Some("v"));
        // Next read repopulates from the backing store
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
