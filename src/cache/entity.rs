//! Generic cache-aside protocol shared by every cached entity.
//!
//! ## Layout
//!
//! A record is serialized once, under its *value key*. Records with a second
//! natural key also get a pointer entry `alias key -> value key`:
//!
//! | Entity       | Value key  | Alias key |
//! |--------------|------------|-----------|
//! | Organization | slug       | id        |
//! | PAT          | token hash | id        |
//! | Session      | token hash | -         |
//! | Team         | id         | -         |
//!
//! Cache failures never reach the caller. Reads degrade to a miss and
//! writes/deletes are logged and dropped; the store stays authoritative.
//! Misses are never cached.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::resolver::is_value;
use super::{CacheKeyResolver, CacheNamespace, KeyValueStore};
use crate::error::StoreError;

/// A record that can be held in an [`EntityCache`].
pub trait CachedEntity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Key the serialized record is stored under.
    fn value_key(&self) -> String;

    /// Second natural key, stored as a pointer to [`value_key`](Self::value_key).
    fn alias_key(&self) -> Option<String> {
        None
    }

    /// Returns `true` if `key` is one of this record's natural keys.
    fn matches_key(&self, key: &str) -> bool {
        self.value_key() == key || self.alias_key().as_deref() == Some(key)
    }
}

/// Loads canonical records from the authoritative store.
///
/// `load` receives whichever natural key the caller used and must accept
/// either of them for dual-key entities.
#[async_trait]
pub trait Loader<E>: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<E>, StoreError>;

    async fn load_many(&self, keys: &[String]) -> Result<Vec<E>, StoreError>;
}

/// Keys to invalidate for one record.
///
/// `paired` is the record's other natural key when the caller knows it.
/// When it doesn't, the cache is consulted to discover it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityKeys {
    pub key: String,
    pub paired: Option<String>,
}

impl EntityKeys {
    pub fn single(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            paired: None,
        }
    }

    pub fn pair(key: impl Into<String>, paired: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            paired: Some(paired.into()),
        }
    }

    /// Both natural keys of a record in hand.
    pub fn of<E: CachedEntity>(record: &E) -> Self {
        Self {
            key: record.value_key(),
            paired: record.alias_key(),
        }
    }
}

/// Cache-aside access to one entity kind.
pub struct EntityCache<E> {
    resolver: CacheKeyResolver,
    ttl: Duration,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for EntityCache<E> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
            ttl: self.ttl,
            _entity: PhantomData,
        }
    }
}

impl<E: CachedEntity> EntityCache<E> {
    pub fn new(kv: Arc<dyn KeyValueStore>, namespace: CacheNamespace, ttl: Duration) -> Self {
        Self {
            resolver: CacheKeyResolver::new(kv, namespace),
            ttl,
            _entity: PhantomData,
        }
    }

    pub fn namespace(&self) -> CacheNamespace {
        self.resolver.namespace()
    }

    /// Look `key` up in the cache only.
    ///
    /// A payload that fails to deserialize, or that belongs to a record
    /// not addressable by `key`, is a miss.
    pub async fn cached(&self, key: &str) -> Option<E> {
        let payload = match self.resolver.resolve_value(key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!(namespace = %self.namespace(), key = %key, "cache miss");
                return None;
            }
            Err(e) => {
                warn!(namespace = %self.namespace(), key = %key, error = %e, "cache read failed");
                return None;
            }
        };

        match serde_json::from_str::<E>(&payload) {
            Ok(record) if record.matches_key(key) => {
                debug!(namespace = %self.namespace(), key = %key, "cache hit");
                Some(record)
            }
            Ok(_) => {
                debug!(namespace = %self.namespace(), key = %key, "cached record belongs to another key");
                None
            }
            Err(e) => {
                warn!(namespace = %self.namespace(), key = %key, error = %e, "undecodable cache entry");
                None
            }
        }
    }

    /// Read through the cache, falling back to `loader` on a miss.
    ///
    /// Store errors are returned to the caller.
    pub async fn get<L>(&self, key: &str, loader: &L) -> Result<Option<E>, StoreError>
    where
        L: Loader<E> + ?Sized,
    {
        if let Some(record) = self.cached(key).await {
            return Ok(Some(record));
        }

        let record = loader.load(key).await?;
        if let Some(record) = &record {
            self.set(record).await;
        }

        Ok(record)
    }

    /// Write a record back into the cache.
    ///
    /// Dual-key records are written as two independent entries at once; if
    /// only one lands, later reads through the other key simply miss.
    pub async fn set(&self, record: &E) {
        let payload = match serde_json::to_string(record) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(namespace = %self.namespace(), error = %e, "failed to serialize record for cache");
                return;
            }
        };

        let value_key = record.value_key();
        let value_write = self.resolver.set_value(&value_key, &payload, self.ttl);

        match record.alias_key().filter(|alias| *alias != value_key) {
            Some(alias) => {
                let pointer_write = self.resolver.set_pointer(&alias, &value_key, self.ttl);
                let (value_res, pointer_res) = futures::join!(value_write, pointer_write);
                if let Err(e) = value_res {
                    warn!(namespace = %self.namespace(), key = %value_key, error = %e, "cache write failed");
                }
                if let Err(e) = pointer_res {
                    warn!(namespace = %self.namespace(), key = %alias, error = %e, "cache pointer write failed");
                }
            }
            None => {
                if let Err(e) = value_write.await {
                    warn!(namespace = %self.namespace(), key = %value_key, error = %e, "cache write failed");
                }
            }
        }
    }

    /// Write many records concurrently (best effort).
    pub async fn set_many(&self, records: &[E]) {
        join_all(records.iter().map(|record| self.set(record))).await;
    }

    /// Remove every entry that could resolve to the given records.
    pub async fn invalidate(&self, targets: &[EntityKeys]) {
        let discovered = join_all(targets.iter().map(|target| self.keys_to_delete(target))).await;

        let mut seen = HashSet::new();
        let doomed: Vec<String> = discovered
            .into_iter()
            .flatten()
            .filter(|key| seen.insert(key.clone()))
            .collect();

        if doomed.is_empty() {
            return;
        }

        match self.resolver.delete(&doomed).await {
            Ok(()) => debug!(namespace = %self.namespace(), keys = ?doomed, "cache invalidated"),
            Err(e) => warn!(namespace = %self.namespace(), keys = ?doomed, error = %e, "cache invalidation failed"),
        }
    }

    async fn keys_to_delete(&self, target: &EntityKeys) -> Vec<String> {
        let mut keys = vec![target.key.clone()];

        if let Some(paired) = &target.paired {
            keys.push(paired.clone());
            return keys;
        }

        // Discover the other key from whatever is still cached under this one.
        match self.resolver.get_raw(&target.key).await {
            Ok(Some(stored)) if is_value(&stored) => {
                if let Ok(record) = serde_json::from_str::<E>(&stored) {
                    keys.push(record.value_key());
                    keys.extend(record.alias_key());
                }
            }
            Ok(Some(pointer)) => keys.push(pointer),
            Ok(None) => {}
            Err(e) => {
                warn!(namespace = %self.namespace(), key = %target.key, error = %e, "cache read failed during invalidation");
            }
        }

        keys
    }
}
