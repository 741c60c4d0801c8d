//! Personal access token repository.
//!
//! Tokens resolve by id or by the hash of the raw secret:
//! - `token hash -> PAT` (value)
//! - `id -> token hash` (pointer)

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::warn;

use crate::cache::{CacheNamespace, EntityCache, EntityKeys, KeyValueStore, Loader};
use crate::database::models::PersonalAccessToken;
use crate::database::store::PatStore;
use crate::error::StoreError;
use crate::utils::hash_token;

/// Repository for personal access tokens.
pub struct PatRepository {
    store: Arc<dyn PatStore>,
    cache: EntityCache<PersonalAccessToken>,
}

impl PatRepository {
    pub fn new(store: Arc<dyn PatStore>, kv: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self {
            store,
            cache: EntityCache::new(kv, CacheNamespace::PatData, ttl),
        }
    }

    /// Get a token by id or token hash, recording its usage.
    ///
    /// Usage is written to the store at most once per cooldown. The stamped
    /// copy is written back over the cached one so the next reads see it.
    pub async fn get(&self, id_or_hash: &str) -> Result<Option<PersonalAccessToken>, StoreError> {
        let Some(mut pat) = self.cache.get(id_or_hash, self.store.as_ref()).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if pat.needs_usage_stamp(now) {
            match self.store.touch_last_used(&pat.id, now).await {
                Ok(()) => {
                    pat.last_used = Some(now);
                    self.cache.set(&pat).await;
                }
                Err(e) => warn!("Failed to record usage of PAT {}: {}", pat.id, e),
            }
        }

        Ok(Some(pat))
    }

    /// Get a token from the raw secret presented by a client.
    pub async fn get_by_token(&self, raw_token: &str) -> Result<Option<PersonalAccessToken>, StoreError> {
        self.get(&hash_token(raw_token)).await
    }

    /// Get every token addressable by the given ids or hashes.
    pub async fn get_many(&self, ids_or_hashes: &[String]) -> Result<Vec<PersonalAccessToken>, StoreError> {
        self.cache.get_many(ids_or_hashes, self.store.as_ref()).await
    }

    pub async fn create(&self, pat: &PersonalAccessToken) -> Result<(), StoreError> {
        self.store.insert(pat).await?;
        self.cache.invalidate(&[EntityKeys::of(pat)]).await;
        Ok(())
    }

    /// Replace a token, dropping cache entries under its old and new hash.
    pub async fn update(&self, pat: &PersonalAccessToken) -> Result<(), StoreError> {
        let previous = self.store.load(&pat.id).await?;

        self.store.update(pat).await?;

        let mut targets = vec![EntityKeys::of(pat)];
        if let Some(previous) = previous.filter(|p| p.token_hash != pat.token_hash) {
            targets.push(EntityKeys::of(&previous));
        }
        self.cache.invalidate(&targets).await;
        Ok(())
    }

    /// Revoke a token.
    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let previous = self.store.load(id).await?;

        let deleted = self.store.delete(id).await?;

        let target = match &previous {
            Some(previous) => EntityKeys::of(previous),
            None => EntityKeys::single(id),
        };
        self.cache.invalidate(&[target]).await;
        Ok(deleted)
    }

    /// Drop cached entries for the given tokens.
    pub async fn clear_cache(&self, targets: &[EntityKeys]) {
        self.cache.invalidate(targets).await;
    }
}
