//! Durable queues of project ids awaiting index changes.
//!
//! Producers append ids whenever a project becomes (non-)indexable. The
//! synchronizer drains each list by reading it whole and then deleting it;
//! an id pushed between those two steps is lost from this cycle and only
//! recovered by a later push or the next full resync.

use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheKeyResolver, CacheNamespace, KeyValueStore, dedupe_keys};
use crate::database::Project;
use crate::error::CacheError;

const ADDED_LIST: &str = "added";
const REMOVED_LIST: &str = "removed";

/// Ids drained from both queues, each list deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainedIds {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

/// The `added` / `removed` id queues.
#[derive(Clone)]
pub struct SearchQueue {
    resolver: CacheKeyResolver,
}

impl SearchQueue {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            resolver: CacheKeyResolver::new(kv, CacheNamespace::SearchSyncQueue),
        }
    }

    /// Queue projects to be (re)indexed.
    pub async fn enqueue_added(&self, ids: &[String]) -> Result<(), CacheError> {
        self.resolver.push(ADDED_LIST, ids).await
    }

    /// Queue projects to be dropped from the index.
    pub async fn enqueue_removed(&self, ids: &[String]) -> Result<(), CacheError> {
        self.resolver.push(REMOVED_LIST, ids).await
    }

    /// Queue a project after a write, on whichever list matches its state.
    pub async fn project_changed(&self, project: &Project) -> Result<(), CacheError> {
        let ids = [project.id.clone()];
        if project.is_searchable() {
            self.enqueue_added(&ids).await
        } else {
            self.enqueue_removed(&ids).await
        }
    }

    /// Take everything currently queued.
    ///
    /// Both lists are read before either is cleared, so a failed read
    /// leaves every queued id in place for the next cycle.
    pub async fn drain(&self) -> Result<DrainedIds, CacheError> {
        let added = self.resolver.read_list(ADDED_LIST).await?;
        let removed = self.resolver.read_list(REMOVED_LIST).await?;

        if !added.is_empty() || !removed.is_empty() {
            self.resolver
                .delete(&[ADDED_LIST.to_string(), REMOVED_LIST.to_string()])
                .await?;
        }

        debug!(added = added.len(), removed = removed.len(), "drained search queues");
        Ok(DrainedIds {
            added: dedupe_keys(&added),
            removed: dedupe_keys(&removed),
        })
    }
}
