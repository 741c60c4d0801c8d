//! Search module - keeps the full-text project index in sync with the store.
//!
//! ## Architecture
//!
//! - `SearchDocument` - Denormalized project record as indexed
//! - `SearchIndex` - Index interface, `MeiliIndex` over the Meilisearch HTTP API
//! - `SearchQueue` - `added` / `removed` id queues fed by project writes
//! - `SearchSynchronizer` - Periodic full rebuilds and incremental passes

mod document;
mod index;
mod queue;
mod synchronizer;

pub use document::SearchDocument;
pub use index::{IndexSettings, MeiliConfig, MeiliIndex, SearchIndex};
pub use queue::{DrainedIds, SearchQueue};
pub use synchronizer::{CycleOutcome, SearchSynchronizer, SyncConfig, SyncHandle, SyncState};
