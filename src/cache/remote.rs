//! Redis-backed key/value store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Pool, Runtime};
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use super::{CacheConfig, KeyValueStore, LocalStore};
use crate::error::CacheError;

/// Shared cache backed by a Redis connection pool.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Wrap an existing pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Build a pool from config without checking connectivity.
    pub fn from_config(config: &CacheConfig) -> Result<Self, CacheError> {
        let mut redis_config = deadpool_redis::Config::from_url(&config.redis_url);
        let timeout = Duration::from_millis(config.redis_timeout_ms);

        let pool_config = redis_config
            .pool
            .get_or_insert_with(|| deadpool_redis::PoolConfig::new(config.redis_pool_size));
        pool_config.max_size = config.redis_pool_size;
        pool_config.timeouts.wait = Some(timeout);
        pool_config.timeouts.create = Some(timeout);
        pool_config.timeouts.recycle = Some(timeout);

        let pool = redis_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        Ok(Self::new(pool))
    }

    /// Check that a connection can be taken from the pool.
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.pool.get().await?;
        let value: Option<String> = conn.get(key).await?;
        debug!(key = %key, hit = value.is_some(), "redis GET");
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        // SET EX rejects a zero expiry
        let ttl_secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.pool.get().await?;
        conn.del::<_, ()>(keys.to_vec()).await?;
        Ok(())
    }

    async fn lrange(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, CacheError> {
        let mut conn = self.pool.get().await?;
        Ok(conn.lrange(key, start, stop).await?)
    }

    async fn rpush(&self, key: &str, items: &[String]) -> Result<(), CacheError> {
        if items.is_empty() {
            return Ok(());
        }
        let mut conn = self.pool.get().await?;
        conn.rpush::<_, _, ()>(key, items.to_vec()).await?;
        Ok(())
    }
}

/// Create the cache backend for this process.
///
/// If Redis is disabled or unreachable the process runs on a local store;
/// the relational store stays authoritative either way.
pub async fn connect_cache(config: &CacheConfig) -> Arc<dyn KeyValueStore> {
    if !config.redis_enabled {
        info!("Redis disabled, using local cache only");
        return Arc::new(LocalStore::new(config));
    }

    info!(url = %config.redis_url, "Connecting to Redis");

    let store = match RedisStore::from_config(config) {
        Ok(store) => store,
        Err(e) => {
            warn!(error = %e, "Failed to create Redis pool. Falling back to local cache.");
            return Arc::new(LocalStore::new(config));
        }
    };

    match store.ping().await {
        Ok(()) => {
            info!("Connected to Redis");
            Arc::new(store)
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to Redis. Falling back to local cache.");
            Arc::new(LocalStore::new(config))
        }
    }
}
