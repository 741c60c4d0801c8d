//! Cache module - cache-aside data access over a shared key/value store.
//!
//! ## Architecture
//!
//! - `KeyValueStore` - Backend interface (Redis in production, Moka locally)
//! - `CacheNamespace` - Fixed registry of key prefixes
//! - `CacheKeyResolver` - Namespaced keys with one level of pointer indirection
//! - `EntityCache` - Read-through, write-back and invalidation for one entity kind
//! - `EntityCache::get_many` - Fan-out batch fetch mixing cache hits and store misses
//!
//! ## Usage
//!
//! ```rust,ignore
//! let orgs: EntityCache<Organization> =
//!     EntityCache::new(kv, CacheNamespace::OrganizationData, config.entity_ttl);
//!
//! // Read through the cache by id or slug
//! let org = orgs.get("myorg", store.as_ref()).await?;
//! ```

mod batch;
mod config;
pub(crate) mod entity;
mod local;
mod namespace;
mod remote;
mod resolver;
mod store;

pub use batch::{dedupe_keys, join_by_key};
pub use config::CacheConfig;
pub use entity::{CachedEntity, EntityCache, EntityKeys, Loader};
pub use local::LocalStore;
pub use namespace::CacheNamespace;
pub use remote::{RedisStore, connect_cache};
pub use resolver::{CacheKeyResolver, build_key, is_value};
pub use store::KeyValueStore;
