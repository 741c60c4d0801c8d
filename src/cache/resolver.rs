//! Namespaced keys with one level of indirection.
//!
//! A stored string is either a serialized JSON value or a pointer: the raw
//! key of another entry in the same namespace. JSON payloads always start
//! with `{` or `[`, and pointers (ids, slugs, hashes) never do.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::{CacheNamespace, KeyValueStore};
use crate::error::CacheError;

/// Returns `true` if a stored string is a terminal value rather than a pointer.
pub fn is_value(stored: &str) -> bool {
    matches!(stored.as_bytes().first(), Some(b'{' | b'['))
}

/// Builds namespaced keys and follows pointer entries.
#[derive(Clone)]
pub struct CacheKeyResolver {
    kv: Arc<dyn KeyValueStore>,
    namespace: CacheNamespace,
}

impl CacheKeyResolver {
    pub fn new(kv: Arc<dyn KeyValueStore>, namespace: CacheNamespace) -> Self {
        Self { kv, namespace }
    }

    pub fn namespace(&self) -> CacheNamespace {
        self.namespace
    }

    /// Full storage key for `raw_key` in this namespace.
    pub fn build_key(&self, raw_key: &str) -> String {
        build_key(raw_key, self.namespace)
    }

    /// Raw stored string at `raw_key`, without following pointers.
    pub async fn get_raw(&self, raw_key: &str) -> Result<Option<String>, CacheError> {
        self.kv.get(&self.build_key(raw_key)).await
    }

    /// Resolve `raw_key` to a terminal value, following at most one pointer.
    ///
    /// A pointer whose target is absent resolves to `None`: the two entries
    /// expire independently and a dangling pointer is a plain miss.
    pub async fn resolve_value(&self, raw_key: &str) -> Result<Option<String>, CacheError> {
        let Some(stored) = self.get_raw(raw_key).await? else {
            return Ok(None);
        };

        if is_value(&stored) {
            return Ok(Some(stored));
        }

        let target = self.get_raw(&stored).await?;
        if target.is_none() {
            debug!(
                namespace = %self.namespace,
                key = %raw_key,
                target = %stored,
                "dangling cache pointer"
            );
        }

        // Pointers never chain: a second pointer is treated as a miss.
        Ok(target.filter(|value| is_value(value)))
    }

    /// Store a terminal value at `raw_key`.
    pub async fn set_value(&self, raw_key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.kv.set(&self.build_key(raw_key), value, ttl).await
    }

    /// Store a pointer from `raw_key` to `target_key`.
    pub async fn set_pointer(
        &self,
        raw_key: &str,
        target_key: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.kv.set(&self.build_key(raw_key), target_key, ttl).await
    }

    /// Delete every raw key given.
    pub async fn delete(&self, raw_keys: &[String]) -> Result<(), CacheError> {
        if raw_keys.is_empty() {
            return Ok(());
        }
        let keys: Vec<String> = raw_keys.iter().map(|k| self.build_key(k)).collect();
        self.kv.del(&keys).await
    }

    /// Append to the list at `raw_key`.
    pub async fn push(&self, raw_key: &str, items: &[String]) -> Result<(), CacheError> {
        self.kv.rpush(&self.build_key(raw_key), items).await
    }

    /// Read the whole list at `raw_key`.
    pub async fn read_list(&self, raw_key: &str) -> Result<Vec<String>, CacheError> {
        self.kv.lrange(&self.build_key(raw_key), 0, -1).await
    }
}

/// Concatenate a namespace and a raw key.
pub fn build_key(raw_key: &str, namespace: CacheNamespace) -> String {
    format!("{}:{}", namespace.as_str(), raw_key)
}
