//! Shared test doubles.

use std::time::Duration;

use async_trait::async_trait;

use crate::cache::KeyValueStore;
use crate::error::CacheError;

/// A cache backend that is always down.
pub struct FailingKv;

fn down() -> CacheError {
    CacheError::Unavailable("connection refused".to_string())
}

#[async_trait]
impl KeyValueStore for FailingKv {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(down())
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err(down())
    }

    async fn del(&self, _keys: &[String]) -> Result<(), CacheError> {
        Err(down())
    }

    async fn lrange(
        &self,
        _key: &str,
        _start: isize,
        _stop: isize,
    ) -> Result<Vec<String>, CacheError> {
        Err(down())
    }

    async fn rpush(&self, _key: &str, _items: &[String]) -> Result<(), CacheError> {
        Err(down())
    }
}
