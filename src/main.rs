use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use modhost::cache::connect_cache;
use modhost::config::Config;
use modhost::database::{Database, MongoStore};
use modhost::search::{MeiliIndex, SearchSynchronizer};
use modhost::state::AppState;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("modhost=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting modhost...");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");

    info!("Connecting to MongoDB...");
    let db = Database::connect(&config.mongodb_uri, &config.mongodb_database).await?;
    let store = Arc::new(MongoStore::new(&db));
    info!("Database connected");

    let kv = connect_cache(&config.cache).await;
    let state = AppState::new(store.clone(), kv, config.cache.entity_ttl);
    info!("Cache layer initialized");

    let index = Arc::new(MeiliIndex::new(config.meilisearch.clone()));
    let synchronizer = Arc::new(SearchSynchronizer::new(
        store.clone(),
        store,
        index,
        state.search_queue.clone(),
        config.sync.clone(),
    ));
    let sync_handle = synchronizer.start();

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    sync_handle.stop().await;
    info!("modhost stopped");

    Ok(())
}
