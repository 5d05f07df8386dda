//! In-memory repository implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use stockroom_core::record::{Record, RecordFilter};
use stockroom_core::storage::{MainStore, RepositoryError, Result, UnitOfWork};

use super::locks::RowLocks;

/// Open transaction of an [`InMemoryRepository`].
///
/// Writes are staged and become visible on commit. Rows locked through the
/// transaction stay locked until it ends. Every statement takes the state
/// mutex, so units sharing one transaction run their statements one at a time.
pub struct InMemoryTx<R> {
    state: Arc<Mutex<TxState<R>>>,
}

impl<R> Clone for InMemoryTx<R> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

struct TxState<R> {
    id: u64,
    open: bool,
    /// `None` marks a staged delete.
    staged: HashMap<Uuid, Option<R>>,
    held: HashMap<Uuid, OwnedMutexGuard<()>>,
}

impl<R: Record> TxState<R> {
    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(RepositoryError::TransactionFailed(format!(
                "transaction {} is already closed",
                self.id
            )))
        }
    }

    fn lookup<'a>(&'a self, rows: &'a HashMap<Uuid, R>, id: Uuid) -> Option<&'a R> {
        match self.staged.get(&id) {
            Some(change) => change.as_ref(),
            None => rows.get(&id),
        }
    }
}

/// In-memory storage backend for one record kind.
///
/// Uses a HashMap wrapped in `Arc<RwLock<_>>` plus a row lock registry.
/// Data is not persisted and will be lost when the repository is dropped.
pub struct InMemoryRepository<R> {
    rows: Arc<RwLock<HashMap<Uuid, R>>>,
    locks: Arc<RowLocks>,
    next_tx: Arc<AtomicU64>,
}

impl<R> Clone for InMemoryRepository<R> {
    fn clone(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
            locks: Arc::clone(&self.locks),
            next_tx: Arc::clone(&self.next_tx),
        }
    }
}

impl<R: Record> Default for InMemoryRepository<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> InMemoryRepository<R> {
    /// Creates a new empty in-memory repository.
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
            locks: Arc::new(RowLocks::default()),
            next_tx: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Committed rows matching `filter`, oldest first.
    fn select(rows: &HashMap<Uuid, R>, filter: &RecordFilter) -> Vec<R> {
        let mut matched: Vec<R> = rows
            .values()
            .filter(|r| filter.matches(r.id(), r.code()))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        matched
    }

    /// Rows as seen from `uow`: committed rows overlaid with staged writes.
    async fn view(&self, uow: &UnitOfWork<InMemoryTx<R>>) -> Result<HashMap<Uuid, R>> {
        let mut view = self.rows.read().await.clone();
        if let Some(tx) = uow.handle() {
            let state = tx.state.lock().await;
            state.ensure_open()?;
            for (id, change) in &state.staged {
                match change {
                    Some(record) => view.insert(*id, record.clone()),
                    None => view.remove(id),
                };
            }
        }
        Ok(view)
    }

    fn not_found(id: Uuid) -> RepositoryError {
        RepositoryError::NotFound {
            entity_type: R::KIND,
            id: id.to_string(),
        }
    }

    fn already_exists(id: Uuid) -> RepositoryError {
        RepositoryError::AlreadyExists {
            entity_type: R::KIND,
            id: id.to_string(),
        }
    }

    /// Writes one record, inside the transaction if there is one.
    ///
    /// `expect_existing` selects update (`true`) or create (`false`) checks.
    async fn write(
        &self,
        uow: &UnitOfWork<InMemoryTx<R>>,
        record: &R,
        expect_existing: bool,
    ) -> Result<()> {
        let id = record.id();

        match uow.handle() {
            Some(tx) => {
                let mut state = tx.state.lock().await;
                state.ensure_open()?;

                let acquired = self.locks.acquire([id], &state.held).await;
                state.held.extend(acquired);

                let rows = self.rows.read().await;
                let exists = state.lookup(&rows, id).is_some();
                drop(rows);
                check_existence::<R>(id, exists, expect_existing)?;

                state.staged.insert(id, Some(record.clone()));
                Ok(())
            }
            None => {
                let guards = self.locks.acquire([id], &HashMap::new()).await;
                let result = {
                    let mut rows = self.rows.write().await;
                    check_existence::<R>(id, rows.contains_key(&id), expect_existing)
                        .map(|()| {
                            rows.insert(id, record.clone());
                        })
                };
                drop(guards);
                self.locks.prune();
                result
            }
        }
    }

    async fn finish(&self, tx: InMemoryTx<R>, apply: bool) -> Result<()> {
        let mut state = tx.state.lock().await;
        state.ensure_open()?;
        state.open = false;

        let staged = std::mem::take(&mut state.staged);
        if apply {
            let mut rows = self.rows.write().await;
            for (id, change) in staged {
                match change {
                    Some(record) => rows.insert(id, record),
                    None => rows.remove(&id),
                };
            }
        }

        state.held.clear();
        drop(state);
        self.locks.prune();
        Ok(())
    }
}

fn check_existence<R: Record>(id: Uuid, exists: bool, expect_existing: bool) -> Result<()> {
    match (exists, expect_existing) {
        (true, false) => Err(InMemoryRepository::<R>::already_exists(id)),
        (false, true) => Err(InMemoryRepository::<R>::not_found(id)),
        _ => Ok(()),
    }
}

#[async_trait]
impl<R: Record> MainStore<R> for InMemoryRepository<R> {
    type Tx = InMemoryTx<R>;

    async fn begin(&self) -> Result<InMemoryTx<R>> {
        let id = self.next_tx.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(kind = R::KIND, tx = id, "Begin");
        Ok(InMemoryTx {
            state: Arc::new(Mutex::new(TxState {
                id,
                open: true,
                staged: HashMap::new(),
                held: HashMap::new(),
            })),
        })
    }

    async fn commit(&self, tx: InMemoryTx<R>) -> Result<()> {
        self.finish(tx, true).await
    }

    async fn rollback(&self, tx: InMemoryTx<R>) -> Result<()> {
        self.finish(tx, false).await
    }

    async fn create(&self, uow: &UnitOfWork<InMemoryTx<R>>, record: &R) -> Result<()> {
        self.write(uow, record, false).await
    }

    async fn update(&self, uow: &UnitOfWork<InMemoryTx<R>>, record: &R) -> Result<()> {
        self.write(uow, record, true).await
    }

    async fn find_by_id(&self, uow: &UnitOfWork<InMemoryTx<R>>, id: Uuid) -> Result<Option<R>> {
        Ok(self.view(uow).await?.remove(&id))
    }

    async fn find_by_filter(
        &self,
        uow: &UnitOfWork<InMemoryTx<R>>,
        filter: &RecordFilter,
        lock: bool,
    ) -> Result<Vec<R>> {
        if !lock {
            return Ok(Self::select(&self.view(uow).await?, filter));
        }

        // Lock every listed id, existing or not, plus whatever else matches.
        let mut ids = filter.ids.clone();
        ids.extend(
            Self::select(&self.view(uow).await?, filter)
                .iter()
                .map(Record::id),
        );

        match uow.handle() {
            Some(tx) => {
                let mut state = tx.state.lock().await;
                state.ensure_open()?;
                let acquired = self.locks.acquire(ids, &state.held).await;
                state.held.extend(acquired);
                drop(state);
                Ok(Self::select(&self.view(uow).await?, filter))
            }
            None => {
                let guards = self.locks.acquire(ids, &HashMap::new()).await;
                let matched = Self::select(&*self.rows.read().await, filter);
                drop(guards);
                self.locks.prune();
                Ok(matched)
            }
        }
    }

    async fn find_page(
        &self,
        uow: &UnitOfWork<InMemoryTx<R>>,
        filter: &RecordFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<R>> {
        let matched = Self::select(&self.view(uow).await?, filter);
        Ok(matched
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn find_total_by_filter(
        &self,
        uow: &UnitOfWork<InMemoryTx<R>>,
        filter: &RecordFilter,
    ) -> Result<i64> {
        let view = self.view(uow).await?;
        Ok(view
            .values()
            .filter(|r| filter.matches(r.id(), r.code()))
            .count() as i64)
    }

    async fn delete(&self, uow: &UnitOfWork<InMemoryTx<R>>, filter: &RecordFilter) -> Result<()> {
        if filter.ids.is_empty() {
            return Ok(());
        }

        match uow.handle() {
            Some(tx) => {
                let mut state = tx.state.lock().await;
                state.ensure_open()?;
                let acquired = self.locks.acquire(filter.ids.iter().copied(), &state.held).await;
                state.held.extend(acquired);
                for id in &filter.ids {
                    state.staged.insert(*id, None);
                }
            }
            None => {
                let guards = self
                    .locks
                    .acquire(filter.ids.iter().copied(), &HashMap::new())
                    .await;
                {
                    let mut rows = self.rows.write().await;
                    for id in &filter.ids {
                        rows.remove(id);
                    }
                }
                drop(guards);
                self.locks.prune();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use stockroom_core::record::{Channel, Location};
    use stockroom_core::storage::{run_in_transaction, TransactionError};

    fn none() -> UnitOfWork<InMemoryTx<Channel>> {
        UnitOfWork::None
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = InMemoryRepository::<Channel>::new();
        let channel = Channel::new("WEB");

        repo.create(&none(), &channel).await.unwrap();

        let found = repo.find_by_id(&none(), channel.id).await.unwrap();
        assert_eq!(found, Some(channel));
    }

    #[tokio::test]
    async fn test_create_duplicate_fails() {
        let repo = InMemoryRepository::<Channel>::new();
        let channel = Channel::new("WEB");
        repo.create(&none(), &channel).await.unwrap();

        let result = repo.create(&none(), &channel).await;

        assert!(matches!(
            result,
            Err(RepositoryError::AlreadyExists {
                entity_type: "channel",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_update_missing_fails() {
        let repo = InMemoryRepository::<Location>::new();
        let location = Location::new("WH");

        let result = repo.update(&UnitOfWork::None, &location).await;

        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_transaction_writes_visible_only_after_commit() {
        let repo = InMemoryRepository::<Channel>::new();
        let channel = Channel::new("STAGED");

        let tx = repo.begin().await.unwrap();
        let uow = UnitOfWork::Active(tx.clone());
        repo.create(&uow, &channel).await.unwrap();

        assert!(repo.find_by_id(&uow, channel.id).await.unwrap().is_some());
        assert!(repo.find_by_id(&none(), channel.id).await.unwrap().is_none());

        repo.commit(tx).await.unwrap();

        assert!(repo.find_by_id(&none(), channel.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let repo = InMemoryRepository::<Channel>::new();
        let existing = Channel::new("KEEP");
        repo.create(&none(), &existing).await.unwrap();

        let tx = repo.begin().await.unwrap();
        let uow = UnitOfWork::Active(tx.clone());
        repo.create(&uow, &Channel::new("NEW")).await.unwrap();
        let mut changed = existing.clone();
        changed.code = "CHANGED".to_string();
        repo.update(&uow, &changed).await.unwrap();
        repo.rollback(tx).await.unwrap();

        let all = repo
            .find_by_filter(&none(), &RecordFilter::default(), false)
            .await
            .unwrap();
        assert_eq!(all, vec![existing]);
    }

    #[tokio::test]
    async fn test_closed_transaction_rejects_statements() {
        let repo = InMemoryRepository::<Channel>::new();
        let tx = repo.begin().await.unwrap();
        repo.commit(tx.clone()).await.unwrap();

        let uow = UnitOfWork::Active(tx.clone());
        let result = repo.create(&uow, &Channel::new("LATE")).await;

        assert!(matches!(result, Err(RepositoryError::TransactionFailed(_))));
        assert!(repo.commit(tx).await.is_err());
    }

    #[tokio::test]
    async fn test_locked_rows_block_other_transactions() {
        let repo = InMemoryRepository::<Channel>::new();
        let channel = Channel::new("HOT");
        repo.create(&none(), &channel).await.unwrap();

        let tx = repo.begin().await.unwrap();
        let uow = UnitOfWork::Active(tx.clone());
        repo.find_by_filter(&uow, &RecordFilter::by_ids([channel.id]), true)
            .await
            .unwrap();

        let contender = {
            let repo = repo.clone();
            let id = channel.id;
            tokio::spawn(async move {
                let tx = repo.begin().await.unwrap();
                let uow = UnitOfWork::Active(tx.clone());
                let found = repo
                    .find_by_filter(&uow, &RecordFilter::by_ids([id]), true)
                    .await
                    .unwrap();
                repo.commit(tx).await.unwrap();
                found
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        let mut changed = channel.clone();
        changed.code = "COLD".to_string();
        repo.update(&uow, &changed).await.unwrap();
        repo.commit(tx).await.unwrap();

        let seen = contender.await.unwrap();
        assert_eq!(seen[0].code, "COLD");
    }

    #[tokio::test]
    async fn test_lock_without_transaction_is_released() {
        let repo = InMemoryRepository::<Channel>::new();
        let channel = Channel::new("A");
        repo.create(&none(), &channel).await.unwrap();

        repo.find_by_filter(&none(), &RecordFilter::by_ids([channel.id]), true)
            .await
            .unwrap();

        let mut changed = channel.clone();
        changed.code = "B".to_string();
        tokio::time::timeout(Duration::from_millis(100), repo.update(&none(), &changed))
            .await
            .expect("row lock should have been released")
            .unwrap();
        assert_eq!(repo.locks.len(), 0);
    }

    #[tokio::test]
    async fn test_find_page_and_total() {
        let repo = InMemoryRepository::<Location>::new();
        for i in 0..5 {
            repo.create(&UnitOfWork::None, &Location::new(format!("L{i}")))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let page = repo
            .find_page(&UnitOfWork::None, &RecordFilter::default(), 2, 2)
            .await
            .unwrap();
        let total = repo
            .find_total_by_filter(&UnitOfWork::None, &RecordFilter::by_codes(["L1", "L3"]))
            .await
            .unwrap();

        let codes: Vec<&str> = page.iter().map(|l| l.code.as_str()).collect();
        assert_eq!(codes, vec!["L2", "L3"]);
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_delete_with_empty_ids_deletes_nothing() {
        let repo = InMemoryRepository::<Channel>::new();
        repo.create(&none(), &Channel::new("A")).await.unwrap();

        repo.delete(&none(), &RecordFilter::by_codes(["A"]))
            .await
            .unwrap();

        let total = repo
            .find_total_by_filter(&none(), &RecordFilter::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_delete_inside_transaction() {
        let repo = InMemoryRepository::<Channel>::new();
        let channel = Channel::new("GONE");
        repo.create(&none(), &channel).await.unwrap();

        let result: std::result::Result<(), TransactionError<RepositoryError>> =
            run_in_transaction(&repo, &UnitOfWork::None, |uow| {
                let repo = &repo;
                async move {
                    repo.delete(&uow, &RecordFilter::by_ids([channel.id])).await?;
                    assert!(repo.find_by_id(&uow, channel.id).await?.is_none());
                    Ok(())
                }
            })
            .await;

        assert!(result.is_ok());
        assert!(repo.find_by_id(&none(), channel.id).await.unwrap().is_none());
    }
}
