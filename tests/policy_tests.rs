//! Policy Tests
//!
//! End-to-end behavior of each cache policy through the public API, on a
//! paused tokio clock.

use std::sync::Arc;
use std::time::Duration;

use cache_policies::{
    BackingStore, CacheError, DependencyCache, MemoryBackingStore, Peer, ReplicatedCache, Store,
    TtlStore, WriteBehindCache, WriteThroughCache,
};
use tokio::time::{advance, sleep};
use tokio_test::assert_ok;

const TTL: Duration = Duration::from_millis(100);

fn backing() -> Arc<MemoryBackingStore<String>> {
    Arc::new(MemoryBackingStore::<String>::new())
}

// == TTL Store ==

#[tokio::test(start_paused = true)]
async fn test_ttl_store_concrete_scenario() {
    let mut store = TtlStore::new(TTL);

    store.set("k".to_string(), "v".to_string());

    advance(Duration::from_millis(50)).await;
    assert_eq!(store.get("k"), Some("v".to_string()));

    advance(Duration::from_millis(100)).await;
    assert_eq!(store.get("k"), None);

    let stats = store.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.sets, 1);
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.size, 0);
    assert_eq!(stats.hit_ratio, 50.0);
}

#[tokio::test(start_paused = true)]
async fn test_overwrite_restarts_ttl() {
    let mut store = TtlStore::new(TTL);

    store.set("k".to_string(), 1);
    advance(Duration::from_millis(80)).await;
    store.set("k".to_string(), 2);
    advance(Duration::from_millis(80)).await;

    assert_eq!(store.get("k"), Some(2));
    assert_eq!(store.stats().sets, 2);
}

#[test]
fn test_hit_ratio_is_zero_without_accesses() {
    let store: TtlStore<u8> = TtlStore::new(TTL);
    assert_eq!(store.hit_ratio(), 0.0);
}

// == Write-Through ==

#[tokio::test(start_paused = true)]
async fn test_write_through_read_after_write() {
    let backing = backing();
    let cache = WriteThroughCache::new(backing.clone(), TTL);

    assert_ok!(cache.set("user:1", "Ada".to_string()).await);

    assert_eq!(backing.document("user:1").await, Some("Ada".to_string()));
    assert_eq!(cache.get("user:1").await, Ok(Some("Ada".to_string())));
    assert_eq!(backing.find_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_write_through_reads_backing_after_expiry() {
    let backing = backing();
    let cache = WriteThroughCache::new(backing.clone(), TTL);

    assert_ok!(cache.set("user:1", "Ada".to_string()).await);
    advance(TTL * 2).await;

    assert_eq!(cache.get("user:1").await, Ok(Some("Ada".to_string())));
    assert_eq!(backing.find_calls(), 1);

    let stats = cache.stats().await;
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.size, 1);
}

#[tokio::test(start_paused = true)]
async fn test_write_through_rejected_write_leaves_cache_untouched() {
    let backing = backing();
    backing.set_fail_writes(true);
    let cache = WriteThroughCache::new(backing.clone(), TTL);

    let result = cache.set("k", "v".to_string()).await;
    assert!(matches!(result, Err(CacheError::Backend(_))));

    backing.set_fail_writes(false);
    assert_eq!(cache.get("k").await, Ok(None));
}

// == Write-Behind ==

#[tokio::test(start_paused = true)]
async fn test_write_behind_defers_until_flush_interval() {
    let backing = backing();
    let flush_interval = Duration::from_millis(50);
    let cache = WriteBehindCache::new(backing.clone(), TTL, flush_interval);

    cache.set("a", "1".to_string()).await;
    cache.set("b", "2".to_string()).await;
    assert!(backing.is_empty().await);
    assert_eq!(cache.pending().await, 2);

    sleep(flush_interval + Duration::from_millis(5)).await;

    assert_eq!(backing.document("a").await, Some("1".to_string()));
    assert_eq!(backing.document("b").await, Some("2".to_string()));
    assert_eq!(backing.bulk_calls(), 1);
    assert_eq!(cache.pending().await, 0);

    cache.destroy().await;
}

#[tokio::test(start_paused = true)]
async fn test_write_behind_destroy_stops_flushing() {
    let backing = backing();
    let flush_interval = Duration::from_millis(50);
    let cache = WriteBehindCache::new(backing.clone(), TTL, flush_interval);

    cache.destroy().await;
    assert!(!cache.is_running().await);

    cache.set("late", "x".to_string()).await;
    sleep(flush_interval * 3).await;

    assert!(backing.is_empty().await);
    assert_eq!(cache.flush().await, Ok(0));
}

// == Dependency ==

#[tokio::test(start_paused = true)]
async fn test_dependency_invalidation_reaches_direct_dependents() {
    let mut cache = DependencyCache::new(TTL);

    cache.set("a", 1, &[]);
    cache.set("b", 2, &["a".to_string()]);
    cache.set("c", 3, &["b".to_string()]);

    assert_eq!(cache.invalidate("a"), 2);
    assert_eq!(cache.get("a"), None);
    assert_eq!(cache.get("b"), None);
    // One level only
    assert_eq!(cache.get("c"), Some(3));
}

#[tokio::test(start_paused = true)]
async fn test_pattern_without_matches_is_a_no_op() {
    let mut cache = DependencyCache::new(TTL);
    cache.set("user:1", 1, &[]);

    assert_eq!(cache.invalidate_pattern("^order:"), Ok(0));
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats().evictions, 0);
}

#[tokio::test(start_paused = true)]
async fn test_bad_pattern_is_rejected() {
    let mut cache: DependencyCache<i32> = DependencyCache::new(TTL);

    let result = cache.invalidate_pattern("[unclosed");
    assert!(matches!(result, Err(CacheError::InvalidPattern(_))));
}

// == Replicated ==

#[tokio::test(start_paused = true)]
async fn test_replicated_write_reaches_peer_after_delay() {
    let delay = Duration::from_millis(10);
    let x = Arc::new(ReplicatedCache::new("x", TTL).with_propagation_delay(delay));
    let y = Arc::new(ReplicatedCache::new("y", TTL).with_propagation_delay(delay));
    x.add_peer("y", y.clone()).await;

    x.set("k", "v".to_string()).await;
    assert_eq!(y.lookup("k").await, None);

    sleep(delay + Duration::from_millis(1)).await;
    assert_eq!(y.get("k").await, Some("v".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_replicated_miss_reads_through_peer() {
    let x = Arc::new(ReplicatedCache::new("x", TTL));
    let y = Arc::new(ReplicatedCache::new("y", TTL));
    x.add_peer("y", y.clone()).await;

    assert_ok!(y.replicate("k".to_string(), "remote".to_string()).await);

    assert_eq!(x.get("k").await, Some("remote".to_string()));
    // Backfilled locally: the read-through was a local miss, this is a hit
    assert_eq!(x.lookup("k").await, Some("remote".to_string()));
    let stats = x.stats().await;
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
}

// == Composition ==

#[tokio::test(start_paused = true)]
async fn test_policies_accept_any_store() {
    let backing: Arc<dyn BackingStore<String>> = backing();
    let cache = WriteThroughCache::with_store(TtlStore::new(Duration::from_secs(1)), backing);

    assert_ok!(cache.set("k", "v".to_string()).await);
    advance(Duration::from_millis(500)).await;
    assert_eq!(cache.get("k").await, Ok(Some("v".to_string())));
}
