//! Cache Policies - in-memory caching strategies over a slower backing store
//!
//! A TTL store with hit/miss accounting, composed into write-through,
//! write-behind, dependency-invalidating and replicated caches.

pub mod api;
pub mod backing;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod policy;
pub mod tasks;

pub use api::{AppState, PolicyCache};
pub use backing::{BackingStore, MemoryBackingStore};
pub use cache::{CacheStats, Store, TtlStore};
pub use config::{CachePolicy, Config};
pub use error::{CacheError, Result};
pub use policy::{DependencyCache, Peer, ReplicatedCache, WriteBehindCache, WriteThroughCache};
