//! Background synchronizer keeping the search index in line with the store.
//!
//! Each cycle is either a full rebuild (when the last one is missing or
//! older than `full_resync_every`) or an incremental pass over the
//! `added` / `removed` queues. Cycles never overlap: a cycle requested
//! while another runs is skipped.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{IndexSettings, SearchDocument, SearchIndex, SearchQueue};
use crate::cache::dedupe_keys;
use crate::database::{DownloadStats, Project, ProjectStore};
use crate::error::SyncError;

/// Synchronizer timing and batching.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Delay between the end of one cycle and the start of the next.
    pub interval: Duration,
    pub full_resync_every: Duration,
    /// Documents per index request, and ids per store page.
    pub batch_size: usize,
    /// Window for the `recent_downloads` metric.
    pub recent_window: chrono::Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(600),
            full_resync_every: Duration::from_secs(24 * 60 * 60),
            batch_size: 1000,
            recent_window: chrono::Duration::days(15),
        }
    }
}

/// What a cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle was already running.
    Skipped,
    Full {
        indexed: usize,
        failed_pages: usize,
    },
    Incremental {
        indexed: usize,
        removed: usize,
        failed_batches: usize,
    },
}

#[derive(Default)]
pub struct SyncState {
    running: AtomicBool,
    last_full_sync: Mutex<Option<DateTime<Utc>>>,
}

/// Clears the running flag when a cycle ends, including by panic.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncState {
    fn try_enter(&self) -> Option<RunningGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RunningGuard(&self.running))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn last_full_sync(&self) -> Option<DateTime<Utc>> {
        *self.last_full_sync.lock()
    }
}

/// Drives index updates from the project store.
pub struct SearchSynchronizer {
    projects: Arc<dyn ProjectStore>,
    downloads: Arc<dyn DownloadStats>,
    index: Arc<dyn SearchIndex>,
    queue: SearchQueue,
    config: SyncConfig,
    state: SyncState,
}

impl SearchSynchronizer {
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        downloads: Arc<dyn DownloadStats>,
        index: Arc<dyn SearchIndex>,
        queue: SearchQueue,
        config: SyncConfig,
    ) -> Self {
        Self {
            projects,
            downloads,
            index,
            queue,
            config,
            state: SyncState::default(),
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Override when the last full rebuild happened.
    pub fn set_last_full_sync(&self, at: Option<DateTime<Utc>>) {
        *self.state.last_full_sync.lock() = at;
    }

    pub fn needs_full_resync(&self, now: DateTime<Utc>) -> bool {
        match self.state.last_full_sync() {
            None => true,
            Some(last) => (now - last)
                .to_std()
                .is_ok_and(|elapsed| elapsed > self.config.full_resync_every),
        }
    }

    /// Run one cycle unless one is already in progress.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, SyncError> {
        let Some(_guard) = self.state.try_enter() else {
            debug!("search sync already running, skipping cycle");
            return Ok(CycleOutcome::Skipped);
        };

        let now = Utc::now();
        if self.needs_full_resync(now) {
            self.full_resync(now).await
        } else {
            self.incremental_sync(now).await
        }
    }

    async fn full_resync(&self, now: DateTime<Utc>) -> Result<CycleOutcome, SyncError> {
        info!("Starting full search index rebuild");

        self.index.configure(&IndexSettings::projects()).await?;
        self.index.delete_all_documents().await?;

        let take = self.config.batch_size.max(1);
        let mut cursor: Option<String> = None;
        let mut indexed = 0;
        let mut failed_pages = 0;

        loop {
            let page = self
                .projects
                .find_searchable_page(cursor.as_deref(), take)
                .await?;
            let page_len = page.len();
            cursor = page.last().map(|p| p.id.clone());

            if page_len > 0 {
                match self.submit(&page, now).await {
                    Ok(()) => indexed += page_len,
                    Err(e) => {
                        warn!(error = %e, after = ?cursor, "Failed to index page during rebuild");
                        failed_pages += 1;
                    }
                }
            }

            if page_len < take {
                break;
            }
        }

        if failed_pages == 0 {
            *self.state.last_full_sync.lock() = Some(now);
        }

        info!(indexed, failed_pages, "Full search index rebuild finished");
        Ok(CycleOutcome::Full {
            indexed,
            failed_pages,
        })
    }

    async fn incremental_sync(&self, now: DateTime<Utc>) -> Result<CycleOutcome, SyncError> {
        let drained = self.queue.drain().await?;
        let mut to_remove = drained.removed;
        let mut indexed_ids: HashSet<String> = HashSet::new();
        let mut indexed = 0;
        let mut removed = 0;
        let mut failed_batches = 0;

        for chunk in drained.added.chunks(self.config.batch_size.max(1)) {
            match self.index_added(chunk, now).await {
                Ok((added, rejected)) => {
                    indexed += added.len();
                    indexed_ids.extend(added);
                    to_remove.extend(rejected);
                }
                Err(e) => {
                    warn!(error = %e, ids = chunk.len(), "Failed to index added projects");
                    failed_batches += 1;
                    if let Err(e) = self.queue.enqueue_added(chunk).await {
                        error!(error = %e, "Failed to requeue added projects");
                    }
                }
            }
        }

        // The added pass re-checked every id against the store, so it wins
        // over a stale removal queued earlier in the same interval.
        to_remove.retain(|id| !indexed_ids.contains(id));
        let to_remove = dedupe_keys(&to_remove);
        for chunk in to_remove.chunks(self.config.batch_size.max(1)) {
            match self.index.delete_documents(chunk).await {
                Ok(()) => removed += chunk.len(),
                Err(e) => {
                    warn!(error = %e, ids = chunk.len(), "Failed to remove projects from index");
                    failed_batches += 1;
                    if let Err(e) = self.queue.enqueue_removed(chunk).await {
                        error!(error = %e, "Failed to requeue removed projects");
                    }
                }
            }
        }

        if indexed + removed > 0 || failed_batches > 0 {
            info!(indexed, removed, failed_batches, "Incremental search sync finished");
        }
        Ok(CycleOutcome::Incremental {
            indexed,
            removed,
            failed_batches,
        })
    }

    /// Index the searchable projects among `ids`.
    ///
    /// Returns the ids indexed and the ids that should leave the index
    /// instead (no longer searchable, or gone from the store).
    async fn index_added(
        &self,
        ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<(Vec<String>, Vec<String>), SyncError> {
        let projects = self.projects.find_many_by_ids(ids).await?;

        let (searchable, hidden): (Vec<Project>, Vec<Project>) =
            projects.into_iter().partition(Project::is_searchable);

        let found: Vec<&str> = searchable
            .iter()
            .chain(hidden.iter())
            .map(|p| p.id.as_str())
            .collect();
        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !found.contains(&id.as_str()))
            .cloned()
            .collect();
        let mut rejected: Vec<String> = hidden.iter().map(|p| p.id.clone()).collect();
        rejected.extend(missing);
        if !rejected.is_empty() {
            debug!(count = rejected.len(), "Queued projects are not searchable, removing");
        }

        self.submit(&searchable, now).await?;
        Ok((searchable.into_iter().map(|p| p.id).collect(), rejected))
    }

    async fn submit(&self, projects: &[Project], now: DateTime<Utc>) -> Result<(), SyncError> {
        if projects.is_empty() {
            return Ok(());
        }
        let documents = self.hydrate(projects, now).await?;
        self.index.add_documents(&documents).await?;
        Ok(())
    }

    async fn hydrate(
        &self,
        projects: &[Project],
        now: DateTime<Utc>,
    ) -> Result<Vec<SearchDocument>, SyncError> {
        let ids: Vec<String> = projects.iter().map(|p| p.id.clone()).collect();
        let recent = self
            .downloads
            .recent_downloads(&ids, now - self.config.recent_window)
            .await?;

        Ok(projects
            .iter()
            .map(|p| SearchDocument::from_project(p, recent.get(&p.id).copied().unwrap_or(0)))
            .collect())
    }

    /// Spawn the fixed-delay sync loop.
    ///
    /// The first cycle runs immediately. Stopping never interrupts a
    /// cycle in progress; the loop exits at its next sleep.
    pub fn start(self: Arc<Self>) -> SyncHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            info!(
                interval_secs = self.config.interval.as_secs(),
                "Search synchronizer started"
            );

            loop {
                match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
                    Ok(Ok(outcome)) => debug!(?outcome, "Search sync cycle complete"),
                    Ok(Err(e)) => error!(error = %e, "Search sync cycle failed"),
                    Err(_) => error!("Search sync cycle panicked"),
                }

                tokio::select! {
                    _ = tokio::time::sleep(self.config.interval) => {}
                    _ = shutdown_rx.changed() => break,
                }
            }

            info!("Search synchronizer stopped");
        });

        SyncHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle to a running sync loop.
pub struct SyncHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Signal the loop to stop and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Search synchronizer task ended abnormally");
        }
    }
}
