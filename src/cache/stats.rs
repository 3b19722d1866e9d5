//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, sets and evictions.

use serde::Serialize;

// == Cache Stats ==
/// Counter block kept by every store, plus a size and hit ratio snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of writes accepted by the store
    pub sets: u64,
    /// Number of entries dropped by expiry or clear
    pub evictions: u64,
    /// Current number of entries in the cache
    pub size: usize,
    /// Hit ratio as a percentage
    pub hit_ratio: f64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Ratio ==
    /// Calculates the hit ratio as a percentage.
    ///
    /// Returns hits / (hits + misses) * 100, or 0.0 if no reads have been made.
    pub fn compute_hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_set(&mut self) {
        self.sets += 1;
    }

    /// Adds `count` evictions at once.
    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    // == Snapshot ==
    /// Returns a copy with `size` and `hit_ratio` filled in.
    pub fn snapshot(&self, size: usize) -> Self {
        Self {
            size,
            hit_ratio: self.compute_hit_ratio(),
            ..self.clone()
        }
    }
}
