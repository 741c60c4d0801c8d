//! Modhost - data access core for a mod hosting platform.
//!
//! Cache-aside access to platform entities over a shared key/value store,
//! and a background synchronizer for the project search index.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `cache` - Dual-key entity caching over Redis (or a local Moka store)
//! - `database` - MongoDB stores, models and cached repositories
//! - `search` - Search documents, Meilisearch client and synchronizer
//! - `state` - Shared repositories for request handlers
//! - `utils` - Utility functions

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod search;
pub mod state;
pub mod utils;

#[cfg(test)]
mod testing;
