//! Application state.
//!
//! Holds one [`RecordService`] per record kind plus the shutdown signal that
//! in-progress batches observe. Backends are picked by feature flags.

use std::sync::Arc;

use tokio::sync::watch;

use stockroom_core::cache::{Cache, RecordCache};
use stockroom_core::record::{Channel, Location, Record};
use stockroom_core::service::{CacheRefresher, CancelSignal, RecordService, UpsertConfig};

use crate::config::Config;

#[cfg(feature = "inmemory")]
pub type Store<R> = crate::storage::InMemoryRepository<R>;

#[cfg(feature = "postgres")]
pub type Store<R> = crate::storage::PostgresRepository<R>;

/// Service of one record kind as wired by the server.
pub type Service<R> = RecordService<R, Store<R>, dyn Cache>;

/// Shared application state.
///
/// This is cloned for each request handler.
#[derive(Clone)]
pub struct AppState {
    pub channels: Service<Channel>,
    pub locations: Service<Location>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    cancel: CancelSignal,
}

/// Record kinds served by the API.
pub trait ServedRecord: Record {
    fn service(state: &AppState) -> &Service<Self>;
}

impl ServedRecord for Channel {
    fn service(state: &AppState) -> &Service<Self> {
        &state.channels
    }
}

impl ServedRecord for Location {
    fn service(state: &AppState) -> &Service<Self> {
        &state.locations
    }
}

fn service<R: Record>(
    store: Store<R>,
    cache: Arc<dyn Cache>,
    refresher: CacheRefresher,
    upsert: UpsertConfig,
    config: &Config,
) -> Service<R> {
    RecordService::new(
        Arc::new(store),
        RecordCache::new(cache, config.cache_ttl()),
        refresher,
        upsert,
    )
}

impl AppState {
    /// Creates AppState from already opened backends.
    pub fn build(
        channels: Store<Channel>,
        locations: Store<Location>,
        cache: Arc<dyn Cache>,
        config: &Config,
    ) -> Self {
        let refresher = CacheRefresher::new(config.cache_refresh_max_inflight);
        let (shutdown_tx, cancel) = CancelSignal::channel();

        Self {
            channels: service(
                channels,
                Arc::clone(&cache),
                refresher.clone(),
                config.channel,
                config,
            ),
            locations: service(locations, cache, refresher, config.location, config),
            shutdown_tx: Arc::new(shutdown_tx),
            cancel,
        }
    }

    /// Opens the configured storage and cache backends.
    pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
        let (channels, locations) = open_stores(config).await?;
        let cache = open_cache(config).await?;

        Ok(Self::build(channels, locations, cache, config))
    }

    /// Signal observed by batches waiting for a worker slot.
    pub fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }

    /// Stops admitting new units into in-progress batches.
    pub fn signal_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

#[cfg(feature = "inmemory")]
async fn open_stores(_config: &Config) -> Result<(Store<Channel>, Store<Location>), anyhow::Error> {
    tracing::info!("Using in-memory storage");
    Ok((Store::new(), Store::new()))
}

#[cfg(feature = "postgres")]
async fn open_stores(config: &Config) -> Result<(Store<Channel>, Store<Location>), anyhow::Error> {
    let pool = crate::storage::postgres::connect(
        &config.database_url,
        config.database_max_connections,
    )
    .await?;
    tracing::info!(
        max_connections = config.database_max_connections,
        "Connected to Postgres"
    );
    Ok((Store::new(pool.clone()).await?, Store::new(pool).await?))
}

#[cfg(feature = "memory")]
async fn open_cache(config: &Config) -> Result<Arc<dyn Cache>, anyhow::Error> {
    let cache = crate::cache::MemoryCache::new(config.cache_max_entries)?;
    tracing::info!(max_entries = config.cache_max_entries, "Using in-memory cache");
    Ok(Arc::new(cache))
}

#[cfg(feature = "redis")]
async fn open_cache(config: &Config) -> Result<Arc<dyn Cache>, anyhow::Error> {
    let cache = crate::cache::RedisCache::new(&config.redis_url).await?;
    tracing::info!("Connected to Redis");
    Ok(Arc::new(cache))
}
