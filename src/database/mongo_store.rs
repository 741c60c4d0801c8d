//! MongoDB implementation of the store interfaces.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::{Bson, Document, doc, to_bson};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::Database;
use super::models::{Organization, PersonalAccessToken, Project, Session, Team};
use super::store::{
    DownloadStats, OrganizationStore, PatStore, ProjectStore, SessionStore, TeamStore,
};
use crate::cache::Loader;
use crate::error::StoreError;

/// All store interfaces over one MongoDB database.
///
/// Every collection keys its records by a string `id` field; MongoDB's own
/// `_id` is never exposed.
#[derive(Clone)]
pub struct MongoStore {
    organizations: Collection<Organization>,
    teams: Collection<Team>,
    pats: Collection<PersonalAccessToken>,
    sessions: Collection<Session>,
    projects: Collection<Project>,
    /// Download events: `{ project_id, recorded_at }` (unix seconds).
    downloads: Collection<Document>,
}

impl MongoStore {
    pub fn new(db: &Database) -> Self {
        Self {
            organizations: db.collection("organizations"),
            teams: db.collection("teams"),
            pats: db.collection("pats"),
            sessions: db.collection("sessions"),
            projects: db.collection("projects"),
            downloads: db.collection("downloads"),
        }
    }
}

fn bson_value<T: Serialize>(value: &T) -> Result<Bson, StoreError> {
    to_bson(value).map_err(|e| StoreError::Bson(e.to_string()))
}

async fn find_all<T>(collection: &Collection<T>, filter: Document) -> Result<Vec<T>, StoreError>
where
    T: DeserializeOwned + Send + Sync,
{
    let cursor = collection.find(filter).await?;
    Ok(cursor.try_collect().await?)
}

async fn replace_by_id<T>(collection: &Collection<T>, id: &str, record: &T) -> Result<(), StoreError>
where
    T: Serialize + Send + Sync,
{
    collection.replace_one(doc! { "id": id }, record).await?;
    Ok(())
}

async fn delete_by_id<T>(collection: &Collection<T>, id: &str) -> Result<bool, StoreError>
where
    T: Send + Sync,
{
    let result = collection.delete_one(doc! { "id": id }).await?;
    Ok(result.deleted_count > 0)
}

fn lowercase_all(keys: &[String]) -> Vec<String> {
    keys.iter().map(|k| k.to_lowercase()).collect()
}

// --- Organizations ---

#[async_trait]
impl Loader<Organization> for MongoStore {
    async fn load(&self, key: &str) -> Result<Option<Organization>, StoreError> {
        let filter = doc! { "$or": [ { "id": key }, { "slug": key.to_lowercase() } ] };
        let result = self.organizations.find_one(filter).await?;
        debug!("DB get organization {}: {:?}", key, result.is_some());
        Ok(result)
    }

    async fn load_many(&self, keys: &[String]) -> Result<Vec<Organization>, StoreError> {
        let filter = doc! {
            "$or": [
                { "id": { "$in": keys } },
                { "slug": { "$in": lowercase_all(keys) } },
            ]
        };
        find_all(&self.organizations, filter).await
    }
}

#[async_trait]
impl OrganizationStore for MongoStore {
    async fn insert(&self, organization: &Organization) -> Result<(), StoreError> {
        self.organizations.insert_one(organization).await?;
        Ok(())
    }

    async fn update(&self, organization: &Organization) -> Result<(), StoreError> {
        replace_by_id(&self.organizations, &organization.id, organization).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        delete_by_id(&self.organizations, id).await
    }
}

// --- Teams ---

#[async_trait]
impl Loader<Team> for MongoStore {
    async fn load(&self, key: &str) -> Result<Option<Team>, StoreError> {
        Ok(self.teams.find_one(doc! { "id": key }).await?)
    }

    async fn load_many(&self, keys: &[String]) -> Result<Vec<Team>, StoreError> {
        find_all(&self.teams, doc! { "id": { "$in": keys } }).await
    }
}

#[async_trait]
impl TeamStore for MongoStore {
    async fn insert(&self, team: &Team) -> Result<(), StoreError> {
        self.teams.insert_one(team).await?;
        Ok(())
    }
}

// --- Personal access tokens ---

#[async_trait]
impl Loader<PersonalAccessToken> for MongoStore {
    async fn load(&self, key: &str) -> Result<Option<PersonalAccessToken>, StoreError> {
        let filter = doc! { "$or": [ { "id": key }, { "token_hash": key } ] };
        Ok(self.pats.find_one(filter).await?)
    }

    async fn load_many(&self, keys: &[String]) -> Result<Vec<PersonalAccessToken>, StoreError> {
        let filter = doc! {
            "$or": [
                { "id": { "$in": keys } },
                { "token_hash": { "$in": keys } },
            ]
        };
        find_all(&self.pats, filter).await
    }
}

#[async_trait]
impl PatStore for MongoStore {
    async fn insert(&self, pat: &PersonalAccessToken) -> Result<(), StoreError> {
        self.pats.insert_one(pat).await?;
        Ok(())
    }

    async fn update(&self, pat: &PersonalAccessToken) -> Result<(), StoreError> {
        replace_by_id(&self.pats, &pat.id, pat).await
    }

    async fn touch_last_used(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let update = doc! { "$set": { "last_used": bson_value(&at)? } };
        self.pats.update_one(doc! { "id": id }, update).await?;
        debug!("Recorded usage of PAT {}", id);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        delete_by_id(&self.pats, id).await
    }
}

// --- Sessions ---

#[async_trait]
impl Loader<Session> for MongoStore {
    async fn load(&self, key: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.find_one(doc! { "session_hash": key }).await?)
    }

    async fn load_many(&self, keys: &[String]) -> Result<Vec<Session>, StoreError> {
        find_all(&self.sessions, doc! { "session_hash": { "$in": keys } }).await
    }
}

#[async_trait]
impl SessionStore for MongoStore {
    async fn insert(&self, session: &Session) -> Result<(), StoreError> {
        self.sessions.insert_one(session).await?;
        Ok(())
    }

    async fn update_expiry(
        &self,
        id: &str,
        last_login: DateTime<Utc>,
        expires: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let update = doc! {
            "$set": {
                "last_login": bson_value(&last_login)?,
                "expires": bson_value(&expires)?,
            }
        };
        self.sessions.update_one(doc! { "id": id }, update).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        delete_by_id(&self.sessions, id).await
    }
}

// --- Projects ---

#[async_trait]
impl ProjectStore for MongoStore {
    async fn find_many_by_ids(&self, ids: &[String]) -> Result<Vec<Project>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        find_all(&self.projects, doc! { "id": { "$in": ids } }).await
    }

    async fn find_searchable_page(
        &self,
        after: Option<&str>,
        take: usize,
    ) -> Result<Vec<Project>, StoreError> {
        let mut filter = doc! {
            "status": { "$in": ["approved", "archived"] },
            "visibility": "public",
        };
        if let Some(after) = after {
            filter.insert("id", doc! { "$gt": after });
        }

        let cursor = self
            .projects
            .find(filter)
            .sort(doc! { "id": 1 })
            .limit(take as i64)
            .await?;

        Ok(cursor.try_collect().await?)
    }
}

#[async_trait]
impl DownloadStats for MongoStore {
    async fn recent_downloads(
        &self,
        project_ids: &[String],
        since: DateTime<Utc>,
    ) -> Result<HashMap<String, u64>, StoreError> {
        if project_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let pipeline = vec![
            doc! {
                "$match": {
                    "project_id": { "$in": project_ids },
                    "recorded_at": { "$gte": since.timestamp() },
                }
            },
            doc! { "$group": { "_id": "$project_id", "count": { "$sum": 1 } } },
        ];

        let mut cursor = self.downloads.aggregate(pipeline).await?;
        let mut counts = HashMap::new();

        while let Some(row) = cursor.try_next().await? {
            let Ok(project_id) = row.get_str("_id") else {
                continue;
            };
            let count = match row.get("count") {
                Some(Bson::Int32(n)) => *n as u64,
                Some(Bson::Int64(n)) => *n as u64,
                _ => 0,
            };
            counts.insert(project_id.to_string(), count);
        }

        Ok(counts)
    }
}
