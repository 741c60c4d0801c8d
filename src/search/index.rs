//! Full-text search index interface and its Meilisearch client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};
use tracing::debug;

use super::SearchDocument;
use crate::error::SearchError;

/// Attribute declarations applied on every full rebuild.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSettings {
    pub filterable_attributes: Vec<String>,
    pub sortable_attributes: Vec<String>,
    pub ranking_rules: Vec<String>,
    pub searchable_attributes: Vec<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl IndexSettings {
    /// Settings for the projects index.
    pub fn projects() -> Self {
        Self {
            filterable_attributes: strings(&[
                "categories",
                "loaders",
                "project_types",
                "game_versions",
                "client_side",
                "server_side",
                "open_source",
                "is_org_owned",
                "visibility",
                "project_id",
            ]),
            sortable_attributes: strings(&[
                "downloads",
                "recent_downloads",
                "follows",
                "created_timestamp",
                "modified_timestamp",
            ]),
            ranking_rules: strings(&["words", "typo", "proximity", "attribute", "sort", "exactness"]),
            searchable_attributes: strings(&["name", "summary", "slug", "categories"]),
        }
    }
}

/// A full-text index of project documents.
///
/// Each call returns once the index has finished applying it.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn configure(&self, settings: &IndexSettings) -> Result<(), SearchError>;

    async fn delete_all_documents(&self) -> Result<(), SearchError>;

    async fn add_documents(&self, documents: &[SearchDocument]) -> Result<(), SearchError>;

    async fn delete_documents(&self, ids: &[String]) -> Result<(), SearchError>;
}

/// Connection settings for Meilisearch.
#[derive(Debug, Clone)]
pub struct MeiliConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub index: String,
    /// How long to wait for an enqueued task before giving up.
    pub task_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for MeiliConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:7700".to_string(),
            api_key: None,
            index: "projects".to_string(),
            task_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_millis(250),
        }
    }
}

#[derive(Deserialize)]
struct TaskInfo {
    #[serde(rename = "taskUid")]
    task_uid: u64,
}

#[derive(Deserialize)]
struct TaskErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct Task {
    status: String,
    #[serde(default)]
    error: Option<TaskErrorBody>,
}

/// Meilisearch over its HTTP API.
#[derive(Clone)]
pub struct MeiliIndex {
    client: Client,
    config: MeiliConfig,
}

impl MeiliIndex {
    pub fn new(config: MeiliConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn index_url(&self, path: &str) -> String {
        format!(
            "{}/indexes/{}{}",
            self.config.url.trim_end_matches('/'),
            self.config.index,
            path
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Send a request that enqueues a task, then wait for that task.
    async fn run_task(&self, request: RequestBuilder) -> Result<(), SearchError> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let info: TaskInfo = response.json().await?;
        self.wait_for_task(info.task_uid).await
    }

    async fn wait_for_task(&self, task_uid: u64) -> Result<(), SearchError> {
        let url = format!("{}/tasks/{}", self.config.url.trim_end_matches('/'), task_uid);
        let deadline = Instant::now() + self.config.task_timeout;

        loop {
            let task: Task = self
                .authorized(self.client.get(&url))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            match task.status.as_str() {
                "succeeded" => {
                    debug!(task_uid, "search task succeeded");
                    return Ok(());
                }
                "failed" | "canceled" => {
                    return Err(SearchError::TaskFailed {
                        task_uid,
                        status: task.status,
                        message: task.error.map(|e| e.message).unwrap_or_default(),
                    });
                }
                _ => {}
            }

            if Instant::now() >= deadline {
                return Err(SearchError::TaskTimeout(task_uid));
            }
            sleep(self.config.poll_interval).await;
        }
    }
}

#[async_trait]
impl SearchIndex for MeiliIndex {
    async fn configure(&self, settings: &IndexSettings) -> Result<(), SearchError> {
        let request = self.client.patch(self.index_url("/settings")).json(settings);
        self.run_task(request).await
    }

    async fn delete_all_documents(&self) -> Result<(), SearchError> {
        let request = self.client.delete(self.index_url("/documents"));
        self.run_task(request).await
    }

    async fn add_documents(&self, documents: &[SearchDocument]) -> Result<(), SearchError> {
        if documents.is_empty() {
            return Ok(());
        }
        let request = self
            .client
            .post(self.index_url("/documents?primaryKey=project_id"))
            .json(documents);
        self.run_task(request).await
    }

    async fn delete_documents(&self, ids: &[String]) -> Result<(), SearchError> {
        if ids.is_empty() {
            return Ok(());
        }
        let request = self
            .client
            .post(self.index_url("/documents/delete-batch"))
            .json(ids);
        self.run_task(request).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;

    /// One call made against a [`RecordingIndex`].
    #[derive(Debug, Clone, PartialEq)]
    pub enum IndexCall {
        Configure,
        DeleteAll,
        Add(Vec<String>),
        Delete(Vec<String>),
    }

    /// Index double that records calls and can fail a number of them.
    #[derive(Default)]
    pub struct RecordingIndex {
        pub calls: Mutex<Vec<IndexCall>>,
        /// Fail this many upcoming add/delete calls.
        pub fail_next: AtomicUsize,
        /// Panic on the next `configure` call.
        pub panic_on_configure: AtomicBool,
    }

    impl RecordingIndex {
        pub fn calls(&self) -> Vec<IndexCall> {
            self.calls.lock().clone()
        }

        fn record(&self, call: IndexCall) -> Result<(), SearchError> {
            let failing = self
                .fail_next
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(SearchError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            self.calls.lock().push(call);
            Ok(())
        }
    }

    #[async_trait]
    impl SearchIndex for RecordingIndex {
        async fn configure(&self, _settings: &IndexSettings) -> Result<(), SearchError> {
            if self.panic_on_configure.swap(false, Ordering::SeqCst) {
                panic!("index settings rejected");
            }
            self.calls.lock().push(IndexCall::Configure);
            Ok(())
        }

        async fn delete_all_documents(&self) -> Result<(), SearchError> {
            self.calls.lock().push(IndexCall::DeleteAll);
            Ok(())
        }

        async fn add_documents(&self, documents: &[SearchDocument]) -> Result<(), SearchError> {
            self.record(IndexCall::Add(
                documents.iter().map(|d| d.project_id.clone()).collect(),
            ))
        }

        async fn delete_documents(&self, ids: &[String]) -> Result<(), SearchError> {
            self.record(IndexCall::Delete(ids.to_vec()))
        }
    }

    #[test]
    fn test_settings_serialize_camel_case() {
        let json = serde_json::to_value(IndexSettings::projects()).unwrap();
        assert!(json["filterableAttributes"].as_array().unwrap().len() > 5);
        assert_eq!(json["rankingRules"][0], "words");
        assert!(json.get("searchableAttributes").is_some());
    }

    #[test]
    fn test_index_url() {
        let index = MeiliIndex::new(MeiliConfig {
            url: "http://search:7700/".to_string(),
            ..Default::default()
        });
        assert_eq!(
            index.index_url("/documents"),
            "http://search:7700/indexes/projects/documents"
        );
    }
}
