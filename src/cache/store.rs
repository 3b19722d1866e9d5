//! Cache Store Module
//!
//! The shared store interface every policy wraps, and the TTL store that
//! implements it.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats};

// == Store Trait ==
/// Key/value store interface the cache policies are composed over.
///
/// `get` is the only operation that records hits and misses; `peek` and
/// `delete` leave the counters alone.
pub trait Store<V>: Send + Sync {
    /// Reads a live value, recording a hit or a miss.
    fn get(&mut self, key: &str) -> Option<V>;

    /// Reads the stored value without touching counters or expiry.
    fn peek(&self, key: &str) -> Option<V>;

    /// Inserts or refreshes an entry.
    fn set(&mut self, key: String, value: V);

    /// Removes an entry, returning whether it was present.
    fn delete(&mut self, key: &str) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Currently stored keys, in no particular order.
    fn keys(&self) -> Vec<String>;

    /// Removes every entry and returns how many were dropped.
    fn clear(&mut self) -> usize;

    /// Counter snapshot including size and hit ratio.
    fn stats(&self) -> CacheStats;

    fn hit_ratio(&self) -> f64 {
        self.stats().hit_ratio
    }
}

// == TTL Store ==
/// In-memory store with a fixed TTL and lazy expiry.
///
/// Expired entries are only detected and removed when they are next read
/// through [`Store::get`]; there is no background sweep.
#[derive(Debug)]
pub struct TtlStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Performance statistics
    stats: CacheStats,
    /// Lifetime of every entry
    ttl: Duration,
}

impl<V> TtlStore<V> {
    // == Constructor ==
    /// Creates an empty store whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl<V> Store<V> for TtlStore<V>
where
    V: Clone + Send + Sync,
{
    // == Get ==
    fn get(&mut self, key: &str) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(self.ttl),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.entries.remove(key);
            self.stats.record_miss();
            self.stats.record_evictions(1);
            debug!(key, "evicted expired entry on read");
            return None;
        }

        self.stats.record_hit();
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    fn peek(&self, key: &str) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Set ==
    fn set(&mut self, key: String, value: V) {
        self.entries.insert(key, CacheEntry::new(value));
        self.stats.record_set();
    }

    // == Delete ==
    fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    // == Clear ==
    fn clear(&mut self) -> usize {
        // Counted before the map is emptied
        let removed = self.entries.len();
        self.entries.clear();
        self.stats.record_evictions(removed);
        removed
    }

    // == Stats ==
    fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len())
    }
}
