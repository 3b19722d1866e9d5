//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

// == Cache Policy ==
/// Which cache policy the server fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicy {
    WriteThrough,
    WriteBehind,
    Dependency,
    Replicated,
}

impl FromStr for CachePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "write-through" => Ok(Self::WriteThrough),
            "write-behind" => Ok(Self::WriteBehind),
            "dependency" => Ok(Self::Dependency),
            "replicated" => Ok(Self::Replicated),
            other => Err(format!("unknown cache policy '{}'", other)),
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WriteThrough => "write-through",
            Self::WriteBehind => "write-behind",
            Self::Dependency => "dependency",
            Self::Replicated => "replicated",
        };
        f.write_str(name)
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache policy served over HTTP
    pub policy: CachePolicy,
    /// Entry TTL in milliseconds
    pub default_ttl_ms: u64,
    /// Write-behind flush period in milliseconds
    pub flush_interval_ms: u64,
    /// Delay before a replicated write reaches peers, in milliseconds
    pub propagation_delay_ms: u64,
    /// Bound on each backing-store or peer call, in milliseconds
    pub operation_timeout_ms: u64,
    /// Number of simulated nodes for the replicated policy
    pub replica_count: usize,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_POLICY` - Policy to serve (default: dependency)
    /// - `DEFAULT_TTL_MS` - Entry TTL (default: 300000)
    /// - `FLUSH_INTERVAL_MS` - Write-behind flush period (default: 60000)
    /// - `PROPAGATION_DELAY_MS` - Replication delay (default: 10)
    /// - `OPERATION_TIMEOUT_MS` - Backing-store/peer call bound (default: 5000)
    /// - `REPLICA_COUNT` - Simulated replicated nodes (default: 3)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    ///
    /// Missing or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            policy: env_or("CACHE_POLICY", defaults.policy),
            default_ttl_ms: env_or("DEFAULT_TTL_MS", defaults.default_ttl_ms),
            flush_interval_ms: env_or("FLUSH_INTERVAL_MS", defaults.flush_interval_ms),
            propagation_delay_ms: env_or("PROPAGATION_DELAY_MS", defaults.propagation_delay_ms),
            operation_timeout_ms: env_or("OPERATION_TIMEOUT_MS", defaults.operation_timeout_ms),
            replica_count: env_or("REPLICA_COUNT", defaults.replica_count),
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn propagation_delay(&self) -> Duration {
        Duration::from_millis(self.propagation_delay_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Returns warnings for settings that work but are likely mistakes.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.policy == CachePolicy::WriteBehind && self.flush_interval_ms >= self.default_ttl_ms {
            warnings.push(format!(
                "FLUSH_INTERVAL_MS ({}) should be shorter than DEFAULT_TTL_MS ({}); dirty writes may expire before they are flushed",
                self.flush_interval_ms, self.default_ttl_ms
            ));
        }
        if self.policy == CachePolicy::Replicated && self.replica_count < 2 {
            warnings.push(format!(
                "REPLICA_COUNT ({}) leaves the replicated cache without peers",
                self.replica_count
            ));
        }

        warnings
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            policy: CachePolicy::Dependency,
            default_ttl_ms: 300_000,
            flush_interval_ms: 60_000,
            propagation_delay_ms: 10,
            operation_timeout_ms: 5_000,
            replica_count: 3,
            server_port: 3000,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
