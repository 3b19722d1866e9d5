//! Policy Dispatch
//!
//! The HTTP layer serves exactly one configured policy. [`PolicyCache`] puts
//! the four policies behind one cache surface so handlers stay policy-agnostic.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::backing::{BackingStore, MemoryBackingStore};
use crate::cache::{CacheStats, TtlStore};
use crate::config::{CachePolicy, Config};
use crate::error::{CacheError, Result};
use crate::policy::{DependencyCache, ReplicatedCache, WriteBehindCache, WriteThroughCache};

/// One configured cache policy over JSON documents.
#[derive(Clone)]
pub enum PolicyCache {
    WriteThrough(Arc<WriteThroughCache<Value>>),
    WriteBehind(Arc<WriteBehindCache<Value>>),
    Dependency(Arc<RwLock<DependencyCache<Value>>>),
    /// The node serving requests; the other replicas live on as its peers
    Replicated(Arc<ReplicatedCache<Value>>),
}

impl PolicyCache {
    /// Builds the policy named in `config` over `backing`.
    ///
    /// The write-behind policy starts its flush task, so this must run inside
    /// a tokio runtime.
    ///
    /// The replicated policy wires its nodes into a full mesh of strong peer
    /// handles. The resulting `Arc` cycles keep every node alive for the life
    /// of the process.
    pub async fn from_config(config: &Config, backing: Arc<MemoryBackingStore<Value>>) -> Self {
        let backing: Arc<dyn BackingStore<Value>> = backing;

        match config.policy {
            CachePolicy::WriteThrough => Self::WriteThrough(Arc::new(
                WriteThroughCache::new(backing, config.ttl())
                    .with_timeout(config.operation_timeout()),
            )),
            CachePolicy::WriteBehind => {
                let cache = WriteBehindCache::with_store(
                    TtlStore::new(config.ttl()),
                    backing,
                    config.flush_interval(),
                    config.operation_timeout(),
                );
                Self::WriteBehind(Arc::new(cache))
            }
            CachePolicy::Dependency => {
                Self::Dependency(Arc::new(RwLock::new(DependencyCache::new(config.ttl()))))
            }
            CachePolicy::Replicated => {
                let replicas: Vec<Arc<ReplicatedCache<Value>>> = (0..config.replica_count.max(1))
                    .map(|index| {
                        Arc::new(
                            ReplicatedCache::new(format!("node-{}", index), config.ttl())
                                .with_propagation_delay(config.propagation_delay())
                                .with_timeout(config.operation_timeout()),
                        )
                    })
                    .collect();

                // Full mesh between the simulated nodes
                for replica in &replicas {
                    for peer in &replicas {
                        if !Arc::ptr_eq(replica, peer) {
                            replica.add_peer(peer.node_id(), peer.clone()).await;
                        }
                    }
                }
                info!(nodes = replicas.len(), "replicated cache mesh ready");

                Self::Replicated(replicas[0].clone())
            }
        }
    }

    pub fn policy(&self) -> CachePolicy {
        match self {
            Self::WriteThrough(_) => CachePolicy::WriteThrough,
            Self::WriteBehind(_) => CachePolicy::WriteBehind,
            Self::Dependency(_) => CachePolicy::Dependency,
            Self::Replicated(_) => CachePolicy::Replicated,
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        match self {
            Self::WriteThrough(cache) => cache.get(key).await,
            Self::WriteBehind(cache) => cache.get(key).await,
            Self::Dependency(cache) => Ok(cache.write().await.get(key)),
            Self::Replicated(node) => Ok(node.get(key).await),
        }
    }

    /// Stores `value`. Dependencies are only accepted by the dependency
    /// policy.
    pub async fn set(&self, key: String, value: Value, dependencies: &[String]) -> Result<()> {
        if !dependencies.is_empty() && !matches!(self, Self::Dependency(_)) {
            return Err(CacheError::InvalidRequest(format!(
                "the {} policy does not track dependencies",
                self.policy()
            )));
        }

        match self {
            Self::WriteThrough(cache) => cache.set(key, value).await,
            Self::WriteBehind(cache) => {
                cache.set(key, value).await;
                Ok(())
            }
            Self::Dependency(cache) => {
                cache.write().await.set(key, value, dependencies);
                Ok(())
            }
            Self::Replicated(node) => {
                node.set(key, value).await;
                Ok(())
            }
        }
    }

    /// Invalidates `key` (and its dependents under the dependency policy).
    /// Other policies drop the local entry only.
    pub async fn invalidate(&self, key: &str) -> usize {
        match self {
            Self::WriteThrough(cache) => usize::from(cache.delete(key).await),
            Self::WriteBehind(cache) => usize::from(cache.delete(key).await),
            Self::Dependency(cache) => cache.write().await.invalidate(key),
            Self::Replicated(node) => usize::from(node.delete(key).await),
        }
    }

    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<usize> {
        match self {
            Self::Dependency(cache) => cache.write().await.invalidate_pattern(pattern),
            _ => Err(CacheError::Unsupported(format!(
                "pattern invalidation requires the dependency policy, not {}",
                self.policy()
            ))),
        }
    }

    pub async fn clear(&self) -> usize {
        match self {
            Self::WriteThrough(cache) => cache.clear().await,
            Self::WriteBehind(cache) => cache.clear().await,
            Self::Dependency(cache) => cache.write().await.clear(),
            Self::Replicated(node) => node.clear().await,
        }
    }

    pub async fn stats(&self) -> CacheStats {
        match self {
            Self::WriteThrough(cache) => cache.stats().await,
            Self::WriteBehind(cache) => cache.stats().await,
            Self::Dependency(cache) => cache.read().await.stats(),
            Self::Replicated(node) => node.stats().await,
        }
    }

    /// Dirty keys waiting for a flush; zero for every other policy.
    pub async fn pending_writes(&self) -> usize {
        match self {
            Self::WriteBehind(cache) => cache.pending().await,
            _ => 0,
        }
    }

    /// Flushes outstanding write-behind work and stops background tasks.
    pub async fn shutdown(&self) {
        if let Self::WriteBehind(cache) = self {
            match cache.flush().await {
                Ok(count) => info!("final write-behind flush wrote {} entries", count),
                Err(err) => warn!(error = %err, "final write-behind flush failed"),
            }
            cache.destroy().await;
        }
    }
}
