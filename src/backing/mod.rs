//! Backing Store Module
//!
//! The authoritative data source the cache policies sit in front of.
//!
//! Only three operations are needed: point reads, single upserts and batched
//! upserts. Upserts must be idempotent per key, since write-behind may
//! deliver the same key more than once after a failed batch.

mod memory;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CacheError, Result};

pub use memory::MemoryBackingStore;

// == Backing Store Trait ==
#[async_trait]
pub trait BackingStore<V>: Send + Sync {
    /// Reads the authoritative value for `key`.
    async fn find(&self, key: &str) -> Result<Option<V>>;

    /// Inserts or replaces the value for `key`.
    async fn upsert(&self, key: &str, value: &V) -> Result<()>;

    /// Writes a whole batch. Success or failure applies to the batch as a
    /// whole: a failed call must leave none of it half-applied from the
    /// caller's point of view, since every key is retried.
    async fn bulk_upsert(&self, items: Vec<(String, V)>) -> Result<()>;
}

// == Timeout Helper ==
/// Bounds a backing-store or peer call with `limit`.
pub(crate) async fn with_timeout<T, F>(limit: Duration, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(CacheError::Timeout(format!(
            "{} exceeded {}ms",
            operation,
            limit.as_millis()
        ))),
    }
}
