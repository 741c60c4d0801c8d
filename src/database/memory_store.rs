//! In-memory store used by tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::models::{Organization, PersonalAccessToken, Project, Session, Team};
use super::store::{
    DownloadStats, OrganizationStore, PatStore, ProjectStore, SessionStore, TeamStore,
};
use crate::cache::{CachedEntity, Loader};
use crate::error::StoreError;

/// Store double holding every collection in memory and counting calls.
#[derive(Default)]
pub struct MemoryStore {
    pub organizations: Mutex<Vec<Organization>>,
    pub teams: Mutex<Vec<Team>>,
    pub pats: Mutex<Vec<PersonalAccessToken>>,
    pub sessions: Mutex<Vec<Session>>,
    pub projects: Mutex<Vec<Project>>,
    pub downloads: Mutex<HashMap<String, u64>>,

    /// Single-key `load` calls, all entity kinds.
    pub loads: AtomicUsize,
    /// Keys passed to each `load_many` call, all entity kinds.
    pub batch_loads: Mutex<Vec<Vec<String>>>,
    pub pat_touches: Mutex<Vec<(String, DateTime<Utc>)>>,
    pub project_page_calls: AtomicUsize,
    /// Make every project read fail.
    pub fail_projects: AtomicBool,
}

impl MemoryStore {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn find<E: CachedEntity>(&self, records: &Mutex<Vec<E>>, key: &str) -> Option<E> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        records.lock().iter().find(|r| r.matches_key(key)).cloned()
    }

    fn find_many<E: CachedEntity>(&self, records: &Mutex<Vec<E>>, keys: &[String]) -> Vec<E> {
        self.batch_loads.lock().push(keys.to_vec());
        records
            .lock()
            .iter()
            .filter(|r| keys.iter().any(|k| r.matches_key(k)))
            .cloned()
            .collect()
    }

    fn project_failure(&self) -> Result<(), StoreError> {
        if self.fail_projects.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("projects offline".to_string()));
        }
        Ok(())
    }
}

fn remove_by<E>(records: &Mutex<Vec<E>>, matches: impl Fn(&E) -> bool) -> bool {
    let mut records = records.lock();
    let before = records.len();
    records.retain(|r| !matches(r));
    records.len() != before
}

#[async_trait]
impl Loader<Organization> for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<Organization>, StoreError> {
        Ok(self.find(&self.organizations, &key.to_lowercase())
            .or_else(|| self.organizations.lock().iter().find(|o| o.id == key).cloned()))
    }

    async fn load_many(&self, keys: &[String]) -> Result<Vec<Organization>, StoreError> {
        Ok(self.find_many(&self.organizations, keys))
    }
}

#[async_trait]
impl OrganizationStore for MemoryStore {
    async fn insert(&self, organization: &Organization) -> Result<(), StoreError> {
        self.organizations.lock().push(organization.clone());
        Ok(())
    }

    async fn update(&self, organization: &Organization) -> Result<(), StoreError> {
        let mut organizations = self.organizations.lock();
        if let Some(existing) = organizations.iter_mut().find(|o| o.id == organization.id) {
            *existing = organization.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(remove_by(&self.organizations, |o| o.id == id))
    }
}

#[async_trait]
impl Loader<Team> for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<Team>, StoreError> {
        Ok(self.find(&self.teams, key))
    }

    async fn load_many(&self, keys: &[String]) -> Result<Vec<Team>, StoreError> {
        Ok(self.find_many(&self.teams, keys))
    }
}

#[async_trait]
impl TeamStore for MemoryStore {
    async fn insert(&self, team: &Team) -> Result<(), StoreError> {
        self.teams.lock().push(team.clone());
        Ok(())
    }
}

#[async_trait]
impl Loader<PersonalAccessToken> for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<PersonalAccessToken>, StoreError> {
        Ok(self.find(&self.pats, key))
    }

    async fn load_many(&self, keys: &[String]) -> Result<Vec<PersonalAccessToken>, StoreError> {
        Ok(self.find_many(&self.pats, keys))
    }
}

#[async_trait]
impl PatStore for MemoryStore {
    async fn insert(&self, pat: &PersonalAccessToken) -> Result<(), StoreError> {
        self.pats.lock().push(pat.clone());
        Ok(())
    }

    async fn update(&self, pat: &PersonalAccessToken) -> Result<(), StoreError> {
        let mut pats = self.pats.lock();
        if let Some(existing) = pats.iter_mut().find(|p| p.id == pat.id) {
            *existing = pat.clone();
        }
        Ok(())
    }

    async fn touch_last_used(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.pat_touches.lock().push((id.to_string(), at));
        if let Some(pat) = self.pats.lock().iter_mut().find(|p| p.id == id) {
            pat.last_used = Some(at);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(remove_by(&self.pats, |p| p.id == id))
    }
}

#[async_trait]
impl Loader<Session> for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.find(&self.sessions, key))
    }

    async fn load_many(&self, keys: &[String]) -> Result<Vec<Session>, StoreError> {
        Ok(self.find_many(&self.sessions, keys))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert(&self, session: &Session) -> Result<(), StoreError> {
        self.sessions.lock().push(session.clone());
        Ok(())
    }

    async fn update_expiry(
        &self,
        id: &str,
        last_login: DateTime<Utc>,
        expires: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(session) = self.sessions.lock().iter_mut().find(|s| s.id == id) {
            session.last_login = last_login;
            session.expires = expires;
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(remove_by(&self.sessions, |s| s.id == id))
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn find_many_by_ids(&self, ids: &[String]) -> Result<Vec<Project>, StoreError> {
        self.project_failure()?;
        Ok(self
            .projects
            .lock()
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn find_searchable_page(
        &self,
        after: Option<&str>,
        take: usize,
    ) -> Result<Vec<Project>, StoreError> {
        self.project_failure()?;
        self.project_page_calls.fetch_add(1, Ordering::SeqCst);

        let mut page: Vec<Project> = self
            .projects
            .lock()
            .iter()
            .filter(|p| p.is_searchable())
            .filter(|p| after.is_none_or(|after| p.id.as_str() > after))
            .cloned()
            .collect();
        page.sort_by(|a, b| a.id.cmp(&b.id));
        page.truncate(take);
        Ok(page)
    }
}

#[async_trait]
impl DownloadStats for MemoryStore {
    async fn recent_downloads(
        &self,
        project_ids: &[String],
        _since: DateTime<Utc>,
    ) -> Result<HashMap<String, u64>, StoreError> {
        let downloads = self.downloads.lock();
        Ok(project_ids
            .iter()
            .filter_map(|id| downloads.get(id).map(|n| (id.clone(), *n)))
            .collect())
    }
}
