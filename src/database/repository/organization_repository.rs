//! Organization repository with dual-key caching.
//!
//! Organizations resolve by id or slug:
//! - `slug -> organization` (value)
//! - `id -> slug` (pointer)
//!
//! Slugs are stored lowercase; callers lowercase them before lookup.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::{
    CacheNamespace, EntityCache, EntityKeys, KeyValueStore, Loader, dedupe_keys, join_by_key,
};
use crate::database::models::{Organization, OrganizationWithTeam, Team};
use crate::database::store::{OrganizationStore, TeamStore};
use crate::error::StoreError;
use crate::utils::normalize_slug;

/// Repository for organizations and their owning teams.
pub struct OrganizationRepository {
    store: Arc<dyn OrganizationStore>,
    teams: Arc<dyn TeamStore>,
    cache: EntityCache<Organization>,
    team_cache: EntityCache<Team>,
}

impl OrganizationRepository {
    pub fn new(
        store: Arc<dyn OrganizationStore>,
        teams: Arc<dyn TeamStore>,
        kv: Arc<dyn KeyValueStore>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            teams,
            cache: EntityCache::new(kv.clone(), CacheNamespace::OrganizationData, ttl),
            team_cache: EntityCache::new(kv, CacheNamespace::TeamData, ttl),
        }
    }

    /// Get an organization by id or (lowercase) slug.
    pub async fn get(&self, id_or_slug: &str) -> Result<Option<Organization>, StoreError> {
        self.cache.get(id_or_slug, self.store.as_ref()).await
    }

    /// Get every organization addressable by the given ids or slugs.
    pub async fn get_many(&self, ids_or_slugs: &[String]) -> Result<Vec<Organization>, StoreError> {
        self.cache.get_many(ids_or_slugs, self.store.as_ref()).await
    }

    /// Get organizations joined with their teams.
    ///
    /// Organizations whose team cannot be found are left out.
    pub async fn get_many_with_team(
        &self,
        ids_or_slugs: &[String],
    ) -> Result<Vec<OrganizationWithTeam>, StoreError> {
        let organizations = self.get_many(ids_or_slugs).await?;
        if organizations.is_empty() {
            return Ok(Vec::new());
        }

        let team_ids: Vec<String> = organizations.iter().map(|o| o.team_id.clone()).collect();
        let teams = self
            .team_cache
            .get_many(&dedupe_keys(&team_ids), self.teams.as_ref())
            .await?;

        let requested = organizations.len();
        let joined = join_by_key(
            organizations,
            teams,
            |organization| organization.team_id.clone(),
            |team| team.id.clone(),
            |organization, team| OrganizationWithTeam { organization, team },
        );

        if joined.len() < requested {
            debug!(
                dropped = requested - joined.len(),
                "organizations without a resolvable team"
            );
        }

        Ok(joined)
    }

    /// Insert a new organization.
    pub async fn create(&self, organization: &Organization) -> Result<(), StoreError> {
        self.store.insert(organization).await?;
        // A previous holder of this slug may still be cached
        self.clear_cache(&organization.id, Some(&organization.slug)).await;
        Ok(())
    }

    /// Replace an organization, dropping cache entries under its old and new keys.
    pub async fn update(&self, organization: &Organization) -> Result<(), StoreError> {
        let previous = self.store.load(&organization.id).await?;

        self.store.update(organization).await?;

        let mut targets = vec![EntityKeys::of(organization)];
        if let Some(previous) = previous.filter(|p| p.slug != organization.slug) {
            targets.push(EntityKeys::of(&previous));
        }
        self.cache.invalidate(&targets).await;
        Ok(())
    }

    /// Delete an organization.
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

    /// Drop cached entries for an organization.
    ///
    /// Without a slug the pointer entry under `id` is used to find it.
    pub async fn clear_cache(&self, id: &str, slug: Option<&str>) {
        let target = match slug {
            Some(slug) => EntityKeys::pair(id, normalize_slug(slug)),
            None => EntityKeys::single(id),
        };
        self.cache.invalidate(&[target]).await;
    }
}
