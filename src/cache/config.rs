//! Cache configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the cache layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Use Redis as the shared cache (falls back to the local store if unreachable).
    pub redis_enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379").
    pub redis_url: String,

    /// Redis connection pool size.
    pub redis_pool_size: usize,

    /// Redis wait/create/recycle timeout in milliseconds.
    pub redis_timeout_ms: u64,

    /// Maximum number of values held by the local fallback store.
    pub local_capacity: u64,

    /// Time-to-live for entity cache entries.
    pub entity_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_enabled: true,
            redis_url: "redis://localhost:6379".to_string(),
            redis_pool_size: 16,
            redis_timeout_ms: 5_000,
            local_capacity: 50_000,
            entity_ttl: Duration::from_secs(1800), // 30 minutes
        }
    }
}

impl CacheConfig {
    /// Create a config that never touches Redis.
    pub fn local_only() -> Self {
        Self {
            redis_enabled: false,
            ..Default::default()
        }
    }
}
