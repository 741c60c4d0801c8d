//! In-process key/value store built on Moka.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use moka::Expiry;
use moka::sync::Cache;

use super::{CacheConfig, KeyValueStore};
use crate::error::CacheError;

#[derive(Clone)]
struct LocalEntry {
    value: Arc<str>,
    ttl: Duration,
}

/// Per-entry expiry: every write restarts the clock with its own TTL.
struct EntryExpiry;

impl Expiry<String, LocalEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &LocalEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &LocalEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Single-instance cache backend.
///
/// This store is:
/// - Thread-safe and clone-friendly (clones share the same data)
/// - LRU-bounded for values, with per-key TTL
/// - Unbounded for lists (lists are drained by their consumer)
#[derive(Clone)]
pub struct LocalStore {
    values: Cache<String, LocalEntry>,
    lists: Arc<DashMap<String, Vec<String>>>,
}

impl LocalStore {
    /// Create a new local store sized from the given config.
    pub fn new(config: &CacheConfig) -> Self {
        let values = Cache::builder()
            .max_capacity(config.local_capacity)
            .expire_after(EntryExpiry)
            .build();

        Self {
            values,
            lists: Arc::new(DashMap::new()),
        }
    }

    /// Check if a value key exists and hasn't expired.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new(&CacheConfig::local_only())
    }
}

/// Resolve Redis-style inclusive, possibly negative, list bounds.
fn list_bounds(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

    if len == 0 || start > stop || start >= len {
        return None;
    }

    Some((start as usize, stop as usize))
}

#[async_trait]
impl KeyValueStore for LocalStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.values.get(key).map(|entry| entry.value.to_string()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.values.insert(
            key.to_string(),
            LocalEntry {
                value: Arc::from(value),
                ttl,
            },
        );
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<(), CacheError> {
        for key in keys {
            self.values.invalidate(key);
            self.lists.remove(key);
        }
        Ok(())
    }

    async fn lrange(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, CacheError> {
        let Some(list) = self.lists.get(key) else {
            return Ok(Vec::new());
        };

        Ok(match list_bounds(list.len(), start, stop) {
            Some((from, to)) => list[from..=to].to_vec(),
            None => Vec::new(),
        })
    }

    async fn rpush(&self, key: &str, items: &[String]) -> Result<(), CacheError> {
        if items.is_empty() {
            return Ok(());
        }
        self.lists
            .entry(key.to_string())
            .or_default()
            .extend(items.iter().cloned());
        Ok(())
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("entry_count", &self.values.entry_count())
            .field("list_count", &self.lists.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_del() {
        let store = LocalStore::default();
        store.set("a", "1", Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));

        store.del(&["a".to_string()]).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entries_expire_independently() {
        let store = LocalStore::default();
        store.set("short", "x", Duration::from_millis(50)).await.unwrap();
        store.set("long", "y", Duration::from_secs(60)).await.unwrap();

        std::thread::sleep(Duration::from_millis(150));

        assert_eq!(store.get("short").await.unwrap(), None);
        assert_eq!(store.get("long").await.unwrap().as_deref(), Some("y"));
    }

    #[tokio::test]
    async fn test_list_push_range_clear() {
        let store = LocalStore::default();
        let items: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        store.rpush("queue", &items).await.unwrap();
        store.rpush("queue", &["d".to_string()]).await.unwrap();

        assert_eq!(store.lrange("queue", 0, -1).await.unwrap(), vec!["a", "b", "c", "d"]);
        assert_eq!(store.lrange("queue", 1, 2).await.unwrap(), vec!["b", "c"]);
        assert_eq!(store.lrange("queue", -2, -1).await.unwrap(), vec!["c", "d"]);
        assert!(store.lrange("missing", 0, -1).await.unwrap().is_empty());

        store.del(&["queue".to_string()]).await.unwrap();
        assert!(store.lrange("queue", 0, -1).await.unwrap().is_empty());
    }

    #[test]
    fn test_list_bounds() {
        assert_eq!(list_bounds(4, 0, -1), Some((0, 3)));
        assert_eq!(list_bounds(4, 0, 10), Some((0, 3)));
        assert_eq!(list_bounds(4, 3, 1), None);
        assert_eq!(list_bounds(0, 0, -1), None);
    }
}
