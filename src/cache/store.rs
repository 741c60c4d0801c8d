//! Key/value backend interface.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

/// A remote (or local) key/value cache with per-key TTL and lists.
///
/// Keys are plain strings; namespacing is done by [`CacheKeyResolver`].
///
/// [`CacheKeyResolver`]: super::CacheKeyResolver
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored at `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` at `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Delete every key in `keys` (values and lists alike).
    async fn del(&self, keys: &[String]) -> Result<(), CacheError>;

    /// Read the list at `key` from `start` to `stop` inclusive.
    /// Negative indices count from the end, so `(0, -1)` reads everything.
    async fn lrange(&self, key: &str, start: isize, stop: isize)
    -> Result<Vec<String>, CacheError>;

    /// Append `items` to the list at `key`.
    async fn rpush(&self, key: &str, items: &[String]) -> Result<(), CacheError>;
}
