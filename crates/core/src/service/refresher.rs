//! Bounded background cache repopulation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::cache::{Cache, RecordCache};
use crate::record::Record;

/// Counters exposed by [`CacheRefresher::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub completed: u64,
    pub failed: u64,
    pub dropped: u64,
}

#[derive(Default)]
struct Counters {
    completed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Runs cache writes in the background with a fixed number of in-flight tasks.
///
/// A refresh that finds no free slot is dropped and counted rather than queued.
/// Reads never wait on it.
#[derive(Clone)]
pub struct CacheRefresher {
    slots: Arc<Semaphore>,
    max_inflight: usize,
    counters: Arc<Counters>,
}

impl CacheRefresher {
    pub fn new(max_inflight: usize) -> Self {
        let max_inflight = max_inflight.max(1);
        Self {
            slots: Arc::new(Semaphore::new(max_inflight)),
            max_inflight,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Schedules `record` to be written to `cache`.
    ///
    /// Returns false if the refresh was dropped.
    pub fn refresh<R, C>(&self, cache: RecordCache<R, C>, record: R) -> bool
    where
        R: Record,
        C: Cache + ?Sized,
    {
        let Ok(permit) = Arc::clone(&self.slots).try_acquire_owned() else {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                kind = R::KIND,
                record_id = %record.id(),
                "Cache refresh dropped, too many in flight"
            );
            return false;
        };

        let counters = Arc::clone(&self.counters);
        tokio::spawn(async move {
            match cache.set(&record).await {
                Ok(()) => {
                    counters.completed.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(kind = R::KIND, record_id = %record.id(), "Cache refreshed");
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        kind = R::KIND,
                        record_id = %record.id(),
                        error = %e,
                        "Cache refresh failed"
                    );
                }
            }
            drop(permit);
        });
        true
    }

    /// Number of refreshes currently running.
    pub fn in_flight(&self) -> usize {
        self.max_inflight - self.slots.available_permits()
    }

    pub fn stats(&self) -> RefreshStats {
        RefreshStats {
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for CacheRefresher {
    fn default() -> Self {
        Self::new(super::DEFAULT_REFRESH_MAX_INFLIGHT)
    }
}
