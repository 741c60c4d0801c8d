//! Error types shared across the data-access and search layers.

use thiserror::Error;

/// Errors raised by a key/value cache backend.
///
/// These never reach callers of the entity caches: every call site in
/// `cache::entity` and `cache::batch` logs them and degrades to a miss.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// No connection could be taken from the pool.
    #[error("redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// A cached payload could not be (de)serialized.
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend is unavailable for another reason.
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by the authoritative store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// MongoDB driver error.
    #[error("database error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// A document could not be converted to or from BSON.
    #[error("bson error: {0}")]
    Bson(String),

    /// The store is unavailable for another reason.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by the full-text search index.
#[derive(Debug, Error)]
pub enum SearchError {
    /// HTTP transport failure.
    #[error("search transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The index answered with a non-success status.
    #[error("search index returned {status}: {body}")]
    Status { status: u16, body: String },

    /// An enqueued index task finished unsuccessfully.
    #[error("search task {task_uid} {status}: {message}")]
    TaskFailed {
        task_uid: u64,
        status: String,
        message: String,
    },

    /// An enqueued index task did not finish in time.
    #[error("search task {0} timed out")]
    TaskTimeout(u64),
}

/// Errors that abort a whole synchronizer cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Search(#[from] SearchError),
}
