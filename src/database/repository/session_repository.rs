//! Session repository.
//!
//! Sessions are cached under their token hash only. Every read checks the
//! expiry inline: expired sessions are deleted, sessions close to expiry
//! are extended, both before the value is returned or cached.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use tracing::debug;

use crate::cache::{CacheNamespace, EntityCache, EntityKeys, KeyValueStore, Loader};
use crate::database::models::Session;
use crate::database::store::SessionStore;
use crate::error::StoreError;
use crate::utils::hash_token;

/// Repository for browser sessions.
pub struct SessionRepository {
    store: Arc<dyn SessionStore>,
    cache: EntityCache<Session>,
}

impl SessionRepository {
    pub fn new(store: Arc<dyn SessionStore>, kv: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self {
            store,
            cache: EntityCache::new(kv, CacheNamespace::SessionData, ttl),
        }
    }

    /// Get a live session by token hash.
    pub async fn get(&self, session_hash: &str) -> Result<Option<Session>, StoreError> {
        self.get_at(session_hash, Utc::now()).await
    }

    /// Get a live session from the raw token presented by a client.
    pub async fn get_by_token(&self, raw_token: &str) -> Result<Option<Session>, StoreError> {
        self.get(&hash_token(raw_token)).await
    }

    async fn get_at(&self, session_hash: &str, now: DateTime<Utc>) -> Result<Option<Session>, StoreError> {
        let (session, cached) = match self.cache.cached(session_hash).await {
            Some(session) => (session, true),
            None => match self.store.load(session_hash).await? {
                Some(session) => (session, false),
                None => return Ok(None),
            },
        };

        self.check_expiry(session, cached, now).await
    }

    /// Apply the expiry rules to a session just read.
    ///
    /// Expired sessions are deleted and dropped from the cache. Sessions
    /// close to expiry are extended. Only live sessions are (re-)cached.
    async fn check_expiry(
        &self,
        mut session: Session,
        cached: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, StoreError> {
        if session.is_expired(now) {
            debug!("Session {} expired, removing", session.id);
            self.store.delete(&session.id).await?;
            self.cache
                .invalidate(&[EntityKeys::single(&session.session_hash)])
                .await;
            return Ok(None);
        }

        if session.needs_extension(now) {
            session.extend(now);
            self.store
                .update_expiry(&session.id, session.last_login, session.expires)
                .await?;
            self.cache.set(&session).await;
            debug!("Extended session {} until {}", session.id, session.expires);
        } else if !cached {
            self.cache.set(&session).await;
        }

        Ok(Some(session))
    }

    /// Get every live session among the given hashes.
    pub async fn get_many(&self, session_hashes: &[String]) -> Result<Vec<Session>, StoreError> {
        self.get_many_at(session_hashes, Utc::now()).await
    }

    async fn get_many_at(
        &self,
        session_hashes: &[String],
        now: DateTime<Utc>,
    ) -> Result<Vec<Session>, StoreError> {
        let found = self.cache.lookup_many(session_hashes, self.store.as_ref()).await?;

        let checked = try_join_all(
            found
                .into_iter()
                .map(|(session, cached)| self.check_expiry(session, cached, now)),
        )
        .await?;

        Ok(checked.into_iter().flatten().collect())
    }

    pub async fn create(&self, session: &Session) -> Result<(), StoreError> {
        self.store.insert(session).await?;
        self.cache.set(session).await;
        Ok(())
    }

    /// Log a session out.
    pub async fn delete(&self, id: &str, session_hash: &str) -> Result<bool, StoreError> {
        let deleted = self.store.delete(id).await?;
        self.clear_cache(&[session_hash.to_string()]).await;
        Ok(deleted)
    }

    pub async fn clear_cache(&self, session_hashes: &[String]) {
        let targets: Vec<EntityKeys> = session_hashes.iter().map(EntityKeys::single).collect();
        self.cache.invalidate(&targets).await;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::cache::LocalStore;
    use crate::database::SESSION_VALIDITY;
    use crate::database::memory_store::MemoryStore;

    fn setup(session: Session) -> (Arc<MemoryStore>, Arc<LocalStore>, SessionRepository) {
        let store = Arc::new(MemoryStore::default());
        store.sessions.lock().push(session);
        let kv = Arc::new(LocalStore::default());
        let repo = SessionRepository::new(store.clone(), kv.clone(), Duration::from_secs(60));
        (store, kv, repo)
    }

    fn session_expiring_in(remaining: ChronoDuration) -> Session {
        let now = Utc::now();
        let mut session = Session::new("s1", hash_token("sess_secret"), "u1", now - ChronoDuration::days(7));
        session.expires = now + remaining;
        session
    }

    #[tokio::test]
    async fn test_fresh_session_is_cached_untouched() {
        let (store, kv, repo) = setup(session_expiring_in(ChronoDuration::days(10)));

        let session = repo.get_by_token("sess_secret").await.unwrap().unwrap();
        assert!(kv.contains(&format!("session-data:{}", session.session_hash)));

        repo.get_by_token("sess_secret").await.unwrap();
        assert_eq!(store.loads(), 1);
        assert_eq!(store.sessions.lock()[0].expires, session.expires);
    }

    #[tokio::test]
    async fn test_session_near_expiry_is_extended() {
        let (store, _, repo) = setup(session_expiring_in(ChronoDuration::days(2)));
        let before = Utc::now();

        let session = repo.get_by_token("sess_secret").await.unwrap().unwrap();

        assert!(session.expires >= before + SESSION_VALIDITY);
        assert_eq!(store.sessions.lock()[0].expires, session.expires);

        // The extended copy is what got cached
        let again = repo.get_by_token("sess_secret").await.unwrap().unwrap();
        assert_eq!(again.expires, session.expires);
        assert_eq!(store.loads(), 1);
    }

    #[tokio::test]
    async fn test_expired_session_is_removed() {
        let (store, kv, repo) = setup(session_expiring_in(ChronoDuration::days(10)));
        let session = repo.get_by_token("sess_secret").await.unwrap().unwrap();

        // Expire it behind the cache's back
        let later = session.expires + ChronoDuration::seconds(1);
        assert_eq!(repo.get_at(&session.session_hash, later).await.unwrap(), None);

        assert!(store.sessions.lock().is_empty());
        assert!(!kv.contains(&format!("session-data:{}", session.session_hash)));
    }

    #[tokio::test]
    async fn test_get_many_applies_expiry_rules() {
        let now = Utc::now();
        let near_expiry = session_expiring_in(ChronoDuration::days(2));
        let mut expired = Session::new("s2", hash_token("old_secret"), "u1", now - ChronoDuration::days(20));
        expired.expires = now - ChronoDuration::minutes(1);
        let (store, kv, repo) = setup(near_expiry.clone());
        store.sessions.lock().push(expired.clone());

        let sessions = repo
            .get_many(&[near_expiry.session_hash.clone(), expired.session_hash.clone()])
            .await
            .unwrap();

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, "s1");
        assert!(sessions[0].expires > near_expiry.expires);

        let stored = store.sessions.lock().clone();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].expires, sessions[0].expires);

        assert!(kv.contains(&format!("session-data:{}", near_expiry.session_hash)));
        assert!(!kv.contains(&format!("session-data:{}", expired.session_hash)));
    }

    #[tokio::test]
    async fn test_get_many_drops_cached_session_once_expired() {
        let (store, kv, repo) = setup(session_expiring_in(ChronoDuration::days(10)));
        let session = repo.get_by_token("sess_secret").await.unwrap().unwrap();

        let later = session.expires + ChronoDuration::seconds(1);
        let sessions = repo
            .get_many_at(&[session.session_hash.clone()], later)
            .await
            .unwrap();

        assert!(sessions.is_empty());
        assert!(store.sessions.lock().is_empty());
        assert!(!kv.contains(&format!("session-data:{}", session.session_hash)));
    }

    #[tokio::test]
    async fn test_logout_invalidates() {
        let (_, kv, repo) = setup(session_expiring_in(ChronoDuration::days(10)));
        let session = repo.get_by_token("sess_secret").await.unwrap().unwrap();

        assert!(repo.delete(&session.id, &session.session_hash).await.unwrap());

        assert!(!kv.contains(&format!("session-data:{}", session.session_hash)));
        assert_eq!(repo.get_by_token("sess_secret").await.unwrap(), None);
    }
}
