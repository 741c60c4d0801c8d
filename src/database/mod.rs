//! Database module exports.

#[cfg(test)]
pub(crate) mod memory_store;
mod models;
mod mongo;
mod mongo_store;
mod repository;
mod store;

pub use models::*;
pub use mongo::Database;
pub use mongo_store::MongoStore;
pub use repository::{OrganizationRepository, PatRepository, SessionRepository};
pub use store::{DownloadStats, OrganizationStore, PatStore, ProjectStore, SessionStore, TeamStore};
