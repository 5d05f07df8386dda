//! Record use cases: the bounded upsert engine and the cache-aside read path.
//!
//! [`RecordService`] is written once against the [`MainStore`] and [`Cache`]
//! ports and instantiated per record kind by the server.

mod cancel;
mod config;
mod error;
mod reads;
mod refresher;
mod upsert;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use crate::cache::{Cache, RecordCache};
use crate::record::Record;
use crate::storage::MainStore;

pub use cancel::CancelSignal;
pub use config::{
    parse_workers, UpsertConfig, DEFAULT_LOCK_DELAY, DEFAULT_REFRESH_MAX_INFLIGHT, DEFAULT_WORKERS,
};
pub use error::UpsertError;
pub use refresher::{CacheRefresher, RefreshStats};
pub use upsert::{UpsertPolicy, UpsertSummary};

/// Use cases of one record kind.
pub struct RecordService<R, S, C: ?Sized> {
    store: Arc<S>,
    cache: RecordCache<R, C>,
    refresher: CacheRefresher,
    config: UpsertConfig,
}

impl<R, S, C: ?Sized> Clone for RecordService<R, S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: self.cache.clone(),
            refresher: self.refresher.clone(),
            config: self.config,
        }
    }
}

impl<R, S, C> RecordService<R, S, C>
where
    R: Record,
    S: MainStore<R>,
    C: Cache + ?Sized,
{
    pub fn new(
        store: Arc<S>,
        cache: RecordCache<R, C>,
        refresher: CacheRefresher,
        config: UpsertConfig,
    ) -> Self {
        Self {
            store,
            cache,
            refresher,
            config,
        }
    }

    pub fn cache(&self) -> &RecordCache<R, C> {
        &self.cache
    }

    pub fn refresher(&self) -> &CacheRefresher {
        &self.refresher
    }

    pub fn config(&self) -> UpsertConfig {
        self.config
    }
}
