//! Narrow interfaces over the authoritative store.
//!
//! Entity stores double as cache [`Loader`]s: `load` accepts either natural
//! key of a dual-key entity.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::{Organization, PersonalAccessToken, Project, Session, Team};
use crate::cache::Loader;
use crate::error::StoreError;

#[async_trait]
pub trait OrganizationStore: Loader<Organization> {
    async fn insert(&self, organization: &Organization) -> Result<(), StoreError>;

    /// Replace the stored organization with the same id.
    async fn update(&self, organization: &Organization) -> Result<(), StoreError>;

    /// Returns `true` if a record was deleted.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait TeamStore: Loader<Team> {
    async fn insert(&self, team: &Team) -> Result<(), StoreError>;
}

#[async_trait]
pub trait PatStore: Loader<PersonalAccessToken> {
    async fn insert(&self, pat: &PersonalAccessToken) -> Result<(), StoreError>;

    async fn update(&self, pat: &PersonalAccessToken) -> Result<(), StoreError>;

    /// Record usage without touching any other field.
    async fn touch_last_used(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait SessionStore: Loader<Session> {
    async fn insert(&self, session: &Session) -> Result<(), StoreError>;

    async fn update_expiry(
        &self,
        id: &str,
        last_login: DateTime<Utc>,
        expires: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Projects with the given ids, in any order. Unknown ids are skipped.
    async fn find_many_by_ids(&self, ids: &[String]) -> Result<Vec<Project>, StoreError>;

    /// Next page of searchable projects with `id > after`, ordered by id.
    async fn find_searchable_page(
        &self,
        after: Option<&str>,
        take: usize,
    ) -> Result<Vec<Project>, StoreError>;
}

#[async_trait]
pub trait DownloadStats: Send + Sync {
    /// Download count per project since `since`. Projects with no downloads
    /// may be absent from the map.
    async fn recent_downloads(
        &self,
        project_ids: &[String],
        since: DateTime<Utc>,
    ) -> Result<HashMap<String, u64>, StoreError>;
}
