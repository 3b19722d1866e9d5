//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;
use crate::config::CachePolicy;

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: Value,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for DELETE /del/:key
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Success message
    pub message: String,
    /// The key that was invalidated
    pub key: String,
    /// Entries removed, dependents included
    pub removed: usize,
}

impl InvalidateResponse {
    pub fn new(key: impl Into<String>, removed: usize) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' invalidated", key),
            key,
            removed,
        }
    }
}

/// Response body for DELETE /invalidate?pattern=...
#[derive(Debug, Clone, Serialize)]
pub struct PatternInvalidateResponse {
    pub pattern: String,
    pub removed: usize,
}

/// Response body for POST /clear
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub removed: usize,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Policy being served
    pub policy: CachePolicy,
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub evictions: u64,
    /// Current number of entries in cache
    pub size: usize,
    /// Hit ratio as a percentage
    pub hit_ratio: f64,
    /// Dirty keys awaiting a write-behind flush
    pub pending_writes: usize,
}

impl StatsResponse {
    pub fn new(policy: CachePolicy, stats: CacheStats, pending_writes: usize) -> Self {
        Self {
            policy,
            hits: stats.hits,
            misses: stats.misses,
            sets: stats.sets,
            evictions: stats.evictions,
            size: stats.size,
            hit_ratio: stats.hit_ratio,
            pending_writes,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_response_serialize() {
        let resp = GetResponse::new("test_key", json!({"n": 1}));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["key"], "test_key");
        assert_eq!(json["value"]["n"], 1);
    }

    #[test]
    fn test_set_response_serialize() {
        let resp = SetResponse::new("my_key");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("my_key"));
        assert!(json.contains("successfully"));
    }

    #[test]
    fn test_invalidate_response_serialize() {
        let resp = InvalidateResponse::new("gone", 3);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["key"], "gone");
        assert_eq!(json["removed"], 3);
    }

    #[test]
    fn test_stats_response_copies_counters() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            sets: 4,
            evictions: 2,
            size: 2,
            hit_ratio: 75.0,
        };
        let resp = StatsResponse::new(CachePolicy::WriteBehind, stats, 5);
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["policy"], "write-behind");
        assert_eq!(json["hits"], 3);
        assert_eq!(json["sets"], 4);
        assert_eq!(json["hit_ratio"], 75.0);
        assert_eq!(json["pending_writes"], 5);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
