//! Shared application state handed to request handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::KeyValueStore;
use crate::database::{
    OrganizationRepository, OrganizationStore, PatRepository, PatStore, SessionRepository,
    SessionStore, TeamStore,
};
use crate::search::SearchQueue;

/// Cached repositories and the search queue, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub organizations: Arc<OrganizationRepository>,
    pub pats: Arc<PatRepository>,
    pub sessions: Arc<SessionRepository>,
    pub search_queue: SearchQueue,
}

impl AppState {
    pub fn new<S>(store: Arc<S>, kv: Arc<dyn KeyValueStore>, ttl: Duration) -> Self
    where
        S: OrganizationStore + TeamStore + PatStore + SessionStore + 'static,
    {
        Self {
            organizations: Arc::new(OrganizationRepository::new(
                store.clone(),
                store.clone(),
                kv.clone(),
                ttl,
            )),
            pats: Arc::new(PatRepository::new(store.clone(), kv.clone(), ttl)),
            sessions: Arc::new(SessionRepository::new(store, kv.clone(), ttl)),
            search_queue: SearchQueue::new(kv),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::cache::LocalStore;
    use crate::database::Organization;
    use crate::database::Session;
    use crate::database::memory_store::MemoryStore;
    use crate::utils::hash_token;

    #[tokio::test]
    async fn test_repositories_share_one_backend() {
        let store = Arc::new(MemoryStore::default());
        let kv = Arc::new(LocalStore::default());
        let state = AppState::new(store.clone(), kv.clone(), Duration::from_secs(60));

        state
            .organizations
            .create(&Organization::new("org1", "Acme", "Acme", "team1"))
            .await
            .unwrap();
        state
            .sessions
            .create(&Session::new("s1", hash_token("tok"), "u1", Utc::now()))
            .await
            .unwrap();

        assert_eq!(state.organizations.get("acme").await.unwrap().unwrap().id, "org1");
        assert!(state.sessions.get_by_token("tok").await.unwrap().is_some());
        assert!(kv.contains("organization-data:acme"));
        assert!(kv.contains(&format!("session-data:{}", hash_token("tok"))));
    }
}
