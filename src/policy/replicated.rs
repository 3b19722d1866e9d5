//! Replicated Cache
//!
//! A simulated multi-node cache. Each node owns a local store and a set of
//! registered peers; writes are propagated to every peer after a short delay
//! and local misses read through the peers in registration order.
//!
//! Consistency is eventual and last-writer-wins per peer, with no ordering
//! guarantees, acknowledgments, retries or de-duplication.
//!
//! Replication is one hop: a node applies a write it receives from a peer but
//! does not pass it on to its own peers. A write on X reaches Z only if Z is
//! registered with X directly, so nodes meant to converge should form a full
//! mesh.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{DEFAULT_OPERATION_TIMEOUT, DEFAULT_PROPAGATION_DELAY};
use crate::cache::{CacheStats, Store, TtlStore};
use crate::error::Result;
use crate::tasks::{spawn_propagation, Propagation};

// == Peer Trait ==
/// A cache node reachable from another node.
///
/// Both operations act on the peer's local store only: a lookup never reads
/// through the peer's own peers, and a replicated write is not forwarded
/// again. Nodes that register each other therefore exchange each write once.
#[async_trait]
pub trait Peer<V>: Send + Sync {
    /// Reads the peer's local copy of `key`.
    async fn lookup(&self, key: &str) -> Option<V>;

    /// Applies a write propagated from another node.
    async fn replicate(&self, key: String, value: V) -> Result<()>;
}

pub struct ReplicatedCache<V, S = TtlStore<V>> {
    node_id: String,
    store: RwLock<S>,
    /// Registration order is lookup order
    peers: RwLock<Vec<(String, Arc<dyn Peer<V>>)>>,
    propagation_delay: Duration,
    timeout: Duration,
}

impl<V> ReplicatedCache<V, TtlStore<V>>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a node over a fresh TTL store.
    pub fn new(node_id: impl Into<String>, ttl: Duration) -> Self {
        Self::with_store(node_id, TtlStore::new(ttl))
    }
}

impl<V, S> ReplicatedCache<V, S>
where
    V: Clone + Send + Sync + 'static,
    S: Store<V>,
{
    pub fn with_store(node_id: impl Into<String>, store: S) -> Self {
        Self {
            node_id: node_id.into(),
            store: RwLock::new(store),
            peers: RwLock::new(Vec::new()),
            propagation_delay: DEFAULT_PROPAGATION_DELAY,
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Sets the simulated network delay applied before each propagation.
    pub fn with_propagation_delay(mut self, delay: Duration) -> Self {
        self.propagation_delay = delay;
        self
    }

    /// Bounds every peer call with `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    // == Add Peer ==
    /// Registers `peer` under `peer_id`.
    ///
    /// Re-registering an id swaps the handle but keeps its original position
    /// in the lookup order.
    pub async fn add_peer(&self, peer_id: impl Into<String>, peer: Arc<dyn Peer<V>>) {
        let peer_id = peer_id.into();
        let mut peers = self.peers.write().await;

        match peers.iter_mut().find(|(id, _)| *id == peer_id) {
            Some(slot) => slot.1 = peer,
            None => peers.push((peer_id.clone(), peer)),
        }
        debug!(node = %self.node_id, peer = %peer_id, "peer registered");
    }

    pub async fn peer_ids(&self) -> Vec<String> {
        self.peers
            .read()
            .await
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    // == Get ==
    /// Reads locally, then asks each peer in registration order.
    ///
    /// The first peer hit is copied into the local store without being
    /// propagated further, unless the key was written locally while the
    /// lookup was in flight. Peers that time out are skipped.
    pub async fn get(&self, key: &str) -> Option<V> {
        let cached = self.store.write().await.get(key);
        if cached.is_some() {
            return cached;
        }

        let peers = self.peers.read().await.clone();
        for (peer_id, peer) in peers {
            match tokio::time::timeout(self.timeout, peer.lookup(key)).await {
                Ok(Some(value)) => {
                    let mut store = self.store.write().await;
                    // A local or replicated write that landed meanwhile is newer
                    if let Some(current) = store.peek(key) {
                        return Some(current);
                    }
                    debug!(node = %self.node_id, peer = %peer_id, key, "backfilled from peer");
                    store.set(key.to_string(), value.clone());
                    return Some(value);
                }
                Ok(None) => {}
                Err(_) => warn!(node = %self.node_id, peer = %peer_id, key, "peer lookup timed out"),
            }
        }

        None
    }

    // == Set ==
    /// Writes locally, then schedules one delayed propagation per peer.
    ///
    /// Returns as soon as the local write is done. Must be called from within
    /// a tokio runtime.
    pub async fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        self.store.write().await.set(key.clone(), value.clone());

        let peers = self.peers.read().await.clone();
        for (peer_id, peer) in peers {
            let propagation = Propagation {
                origin: self.node_id.clone(),
                peer_id,
                peer,
                key: key.clone(),
                value: value.clone(),
            };
            spawn_propagation(propagation, self.propagation_delay, self.timeout);
        }
    }

    /// Drops the local entry only; peers keep their copies.
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

#[async_trait]
impl<V, S> Peer<V> for ReplicatedCache<V, S>
where
    V: Clone + Send + Sync + 'static,
    S: Store<V>,
{
    async fn lookup(&self, key: &str) -> Option<V> {
        self.store.write().await.get(key)
    }

    async fn replicate(&self, key: String, value: V) -> Result<()> {
        self.store.write().await.set(key, value);
        Ok(())
    }
}
