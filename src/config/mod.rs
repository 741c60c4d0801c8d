//! Configuration module for the modhost services.
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::cache::CacheConfig;
use crate::search::{MeiliConfig, SyncConfig};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // MongoDB
    pub mongodb_uri: String,
    pub mongodb_database: String,

    // Redis / local cache
    pub cache: CacheConfig,

    // Meilisearch
    pub meilisearch: MeiliConfig,
    pub sync: SyncConfig,
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mongodb_uri = var("MONGODB_URI").context("MONGODB_URI must be set")?;

        let cache = CacheConfig {
            redis_enabled: parse_or(&var, "REDIS_ENABLED", true)?,
            redis_url: var("REDIS_URL").unwrap_or_else(|| CacheConfig::default().redis_url),
            redis_pool_size: parse_or(&var, "REDIS_POOL_SIZE", 16)?,
            redis_timeout_ms: parse_or(&var, "REDIS_TIMEOUT_MS", 5_000)?,
            local_capacity: parse_or(&var, "LOCAL_CACHE_CAPACITY", 50_000)?,
            entity_ttl: Duration::from_secs(parse_or(&var, "CACHE_TTL_SECS", 1800)?),
        };

        let meilisearch = MeiliConfig {
            url: var("MEILISEARCH_ADDR").unwrap_or_else(|| "http://localhost:7700".to_string()),
            api_key: var("MEILISEARCH_KEY"),
            index: var("MEILISEARCH_INDEX").unwrap_or_else(|| "projects".to_string()),
            ..Default::default()
        };

        let sync = SyncConfig {
            interval: Duration::from_secs(parse_or(&var, "SEARCH_SYNC_INTERVAL_SECS", 600)?),
            full_resync_every: Duration::from_secs(parse_or(
                &var,
                "SEARCH_FULL_RESYNC_SECS",
                86_400,
            )?),
            batch_size: parse_or(&var, "SEARCH_BATCH_SIZE", 1000)?,
            ..Default::default()
        };

        Ok(Self {
            mongodb_uri,
            mongodb_database: var("MONGODB_DATABASE").unwrap_or_else(|| "modhost".to_string()),
            cache,
            meilisearch,
            sync,
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("MONGODB_URI", "mongodb://db")])).unwrap();

        assert_eq!(config.mongodb_database, "modhost");
        assert!(config.cache.redis_enabled);
        assert_eq!(config.cache.entity_ttl, Duration::from_secs(1800));
        assert_eq!(config.meilisearch.index, "projects");
        assert_eq!(config.meilisearch.api_key, None);
        assert_eq!(config.sync.interval, Duration::from_secs(600));
        assert_eq!(config.sync.batch_size, 1000);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("MONGODB_URI", "mongodb://db"),
            ("REDIS_ENABLED", "false"),
            ("CACHE_TTL_SECS", "60"),
            ("MEILISEARCH_KEY", "secret"),
            ("SEARCH_BATCH_SIZE", "250"),
        ]))
        .unwrap();

        assert!(!config.cache.redis_enabled);
        assert_eq!(config.cache.entity_ttl, Duration::from_secs(60));
        assert_eq!(config.meilisearch.api_key.as_deref(), Some("secret"));
        assert_eq!(config.sync.batch_size, 250);
    }

    #[test]
    fn test_missing_uri_is_an_error() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let result = Config::from_lookup(lookup(&[
            ("MONGODB_URI", "mongodb://db"),
            ("REDIS_POOL_SIZE", "lots"),
        ]));
        assert!(result.is_err());
    }
}
