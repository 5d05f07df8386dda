//! Per-row pessimistic locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

type RowLock = Arc<tokio::sync::Mutex<()>>;

/// Registry of row locks keyed by record id.
///
/// Locks are created on first use and pruned once nobody holds them.
#[derive(Debug, Default)]
pub struct RowLocks {
    locks: Mutex<HashMap<Uuid, RowLock>>,
}

impl RowLocks {
    fn handle(&self, id: Uuid) -> RowLock {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(id).or_default())
    }

    /// Locks every id, in ascending order, skipping ids in `held`.
    ///
    /// Acquiring in a global order keeps two lockers of overlapping sets from
    /// deadlocking each other.
    pub async fn acquire(
        &self,
        ids: impl IntoIterator<Item = Uuid>,
        held: &HashMap<Uuid, OwnedMutexGuard<()>>,
    ) -> Vec<(Uuid, OwnedMutexGuard<()>)> {
        let mut ids: Vec<Uuid> = ids.into_iter().filter(|id| !held.contains_key(id)).collect();
        ids.sort_unstable();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            let guard = self.handle(id).lock_owned().await;
            guards.push((id, guard));
        }
        guards
    }

    /// Drops registry entries that no guard or waiter refers to.
    pub fn prune(&self) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
