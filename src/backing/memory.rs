//! In-process backing store.
//!
//! Stands in for the document database behind the cache: the HTTP server
//! runs on it, and tests use its failure switch and call counters to observe
//! what each policy sends downstream.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::BackingStore;
use crate::error::{CacheError, Result};

#[derive(Debug)]
pub struct MemoryBackingStore<V> {
    documents: RwLock<HashMap<String, V>>,
    /// Artificial latency applied to every call
    latency: Duration,
    fail_writes: AtomicBool,
    find_calls: AtomicUsize,
    upsert_calls: AtomicUsize,
    bulk_calls: AtomicUsize,
}

impl<V> Default for MemoryBackingStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MemoryBackingStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            latency: Duration::ZERO,
            fail_writes: AtomicBool::new(false),
            find_calls: AtomicUsize::new(0),
            upsert_calls: AtomicUsize::new(0),
            bulk_calls: AtomicUsize::new(0),
        }
    }

    /// Delays every call by `latency` to model a slow store.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Makes every subsequent write fail until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Writes a document directly, bypassing the counters.
    pub async fn seed(&self, key: impl Into<String>, value: V) {
        self.documents.write().await.insert(key.into(), value);
    }

    /// Reads a document directly, bypassing the counters.
    pub async fn document(&self, key: &str) -> Option<V> {
        self.documents.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(CacheError::Backend("write rejected".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl<V> BackingStore<V> for MemoryBackingStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn find(&self, key: &str) -> Result<Option<V>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        Ok(self.documents.read().await.get(key).cloned())
    }

    async fn upsert(&self, key: &str, value: &V) -> Result<()> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.check_writable()?;

        self.documents
            .write()
            .await
            .insert(key.to_string(), value.clone());
        debug!(key, "backing store upsert");
        Ok(())
    }

    async fn bulk_upsert(&self, items: Vec<(String, V)>) -> Result<()> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.check_writable()?;

        let count = items.len();
        let mut documents = self.documents.write().await;
        for (key, value) in items {
            documents.insert(key, value);
        }
        debug!(count, "backing store bulk upsert");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_and_upsert() {
        let store = MemoryBackingStore::<i32>::new();

        assert_eq!(store.find("a").await, Ok(None));
        store.upsert("a", &1).await.unwrap();
        assert_eq!(store.find("a").await, Ok(Some(1)));

        assert_eq!(store.find_calls(), 2);
        assert_eq!(store.upsert_calls(), 1);
    }

    #[tokio::test]
    async fn test_bulk_upsert_is_all_or_nothing() {
        let store = MemoryBackingStore::<i32>::new();

        store.set_fail_writes(true);
        let result = store
            .bulk_upsert(vec![("a".to_string(), 1), ("b".to_string(), 2)])
            .await;
        assert!(matches!(result, Err(CacheError::Backend(_))));
        assert!(store.is_empty().await);

        store.set_fail_writes(false);
        store
            .bulk_upsert(vec![("a".to_string(), 1), ("b".to_string(), 2)])
            .await
            .unwrap();
        assert_eq!(store.len().await, 2);
        assert_eq!(store.bulk_calls(), 2);
    }

    #[tokio::test]
    async fn test_seed_bypasses_counters() {
        let store = MemoryBackingStore::new();

        store.seed("k", "v".to_string()).await;
        assert_eq!(store.document("k").await.as_deref(), Some("v"));
        assert_eq!(store.upsert_calls(), 0);
        assert_eq!(store.find_calls(), 0);
    }
}
