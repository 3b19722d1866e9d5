//! Dependency Cache
//!
//! Associates each entry with the keys it depends on, so invalidating a key
//! also drops the entries built from it.
//!
//! Invalidation reaches direct dependents only. It does not cascade further,
//! and it leaves the removed dependents' own graph entries in place, so stale
//! edges can outlive the entries they describe until those keys are
//! invalidated themselves.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::time::Duration;

use regex::Regex;
use tracing::debug;

use crate::cache::{CacheStats, Store, TtlStore};
use crate::error::Result;

pub struct DependencyCache<V, S = TtlStore<V>> {
    store: S,
    /// key -> keys it depends on
    forward: HashMap<String, Vec<String>>,
    /// dependency -> keys that depend on it
    reverse: HashMap<String, Vec<String>>,
    _value: PhantomData<fn() -> V>,
}

impl<V> DependencyCache<V, TtlStore<V>>
where
    V: Clone + Send + Sync,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_store(TtlStore::new(ttl))
    }
}

impl<V, S> DependencyCache<V, S>
where
    V: Clone + Send + Sync,
    S: Store<V>,
{
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            forward: HashMap::new(),
            reverse: HashMap::new(),
            _value: PhantomData,
        }
    }

    pub fn get(&mut self, key: &str) -> Option<V> {
        self.store.get(key)
    }

    // == Set ==
    /// Stores `value` and records that `key` depends on each of
    /// `dependencies`.
    ///
    /// A non-empty list replaces the key's recorded dependencies; an empty
    /// list leaves whatever was recorded before.
    pub fn set(&mut self, key: impl Into<String>, value: V, dependencies: &[String]) {
        let key = key.into();
        self.store.set(key.clone(), value);

        if dependencies.is_empty() {
            return;
        }

        for dependency in dependencies {
            let dependents = self.reverse.entry(dependency.clone()).or_default();
            if !dependents.contains(&key) {
                dependents.push(key.clone());
            }
        }
        self.forward.insert(key, dependencies.to_vec());
    }

    // == Invalidate ==
    /// Removes `key` and its direct dependents from the store.
    ///
    /// Returns how many entries were actually removed.
    pub fn invalidate(&mut self, key: &str) -> usize {
        let mut removed = usize::from(self.store.delete(key));

        if let Some(dependents) = self.reverse.get(key) {
            for dependent in dependents {
                if self.store.delete(dependent) {
                    removed += 1;
                }
            }
        }

        self.forward.remove(key);
        self.reverse.remove(key);

        debug!(key, removed, "invalidated");
        removed
    }

    // == Invalidate Pattern ==
    /// Invalidates every cached key matching the regular expression
    /// `pattern`.
    ///
    /// A pattern that does not compile is rejected before anything is
    /// touched. Returns how many entries were removed in total.
    pub fn invalidate_pattern(&mut self, pattern: &str) -> Result<usize> {
        let regex = Regex::new(pattern)?;

        let matches: Vec<String> = self
            .store
            .keys()
            .into_iter()
            .filter(|key| regex.is_match(key))
            .collect();

        let removed: usize = matches.iter().map(|key| self.invalidate(key)).sum();
        debug!(pattern, matched = matches.len(), removed, "pattern invalidated");
        Ok(removed)
    }

    /// Keys that `key` was recorded as depending on.
    pub fn dependencies_of(&self, key: &str) -> &[String] {
        self.forward.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Keys recorded as depending on `key`.
    pub fn dependents_of(&self, key: &str) -> &[String] {
        self.reverse.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Empties the store and forgets the whole dependency graph.
    pub fn clear(&mut self) -> usize {
        self.forward.clear();
        self.reverse.clear();
        self.store.clear()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    pub fn hit_ratio(&self) -> f64 {
        self.store.hit_ratio()
    }
}
