//! Hand-written store and cache doubles shared by the service tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::cache::{self, Cache, CacheError, RecordCache, DEFAULT_RECORD_TTL};
use crate::record::{Record, RecordFilter};
use crate::storage::{MainStore, RepositoryError, Result, UnitOfWork};

use super::{CacheRefresher, RecordService, UpsertConfig};

#[derive(Default)]
struct Faults {
    code: Option<String>,
    panic_code: Option<String>,
    commits: bool,
    filters: bool,
    lookups: bool,
}

/// Transactional in-memory store with fault injection and call counters.
///
/// Writes inside a transaction are staged per handle and applied on commit.
pub struct MockStore<R> {
    rows: Mutex<HashMap<Uuid, R>>,
    staged: Mutex<HashMap<u64, Vec<(Uuid, Option<R>)>>>,
    faults: Mutex<Faults>,
    next_tx: AtomicU64,
    write_delay: Option<Duration>,
    creates: AtomicUsize,
    updates: AtomicUsize,
    lookups: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl<R> Default for MockStore<R> {
    fn default() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            staged: Mutex::new(HashMap::new()),
            faults: Mutex::new(Faults::default()),
            next_tx: AtomicU64::new(1),
            write_delay: None,
            creates: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            lookups: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
            rollbacks: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }
}

impl<R: Record> MockStore<R> {
    /// Every write sleeps for `delay`, so overlapping units are observable.
    pub fn with_write_delay(delay: Duration) -> Self {
        Self {
            write_delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn seed(&self, records: impl IntoIterator<Item = R>) {
        let mut rows = self.rows.lock().unwrap();
        for record in records {
            rows.insert(record.id(), record);
        }
    }

    /// Creates and updates carrying this code fail with "constraint violation".
    pub fn fail_code(&self, code: &str) {
        self.faults.lock().unwrap().code = Some(code.to_string());
    }

    pub fn panic_on_code(&self, code: &str) {
        self.faults.lock().unwrap().panic_code = Some(code.to_string());
    }

    pub fn fail_commits(&self) {
        self.faults.lock().unwrap().commits = true;
    }

    pub fn fail_filters(&self) {
        self.faults.lock().unwrap().filters = true;
    }

    pub fn fail_lookups(&self) {
        self.faults.lock().unwrap().lookups = true;
    }

    pub fn get(&self, id: Uuid) -> Option<R> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    pub fn all(&self) -> Vec<R> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Committed rows overlaid with the writes staged on `uow`.
    fn view(&self, uow: &UnitOfWork<u64>) -> HashMap<Uuid, R> {
        let mut view = self.rows.lock().unwrap().clone();
        if let Some(tx) = uow.handle() {
            if let Some(staged) = self.staged.lock().unwrap().get(tx) {
                for (id, change) in staged {
                    match change {
                        Some(record) => view.insert(*id, record.clone()),
                        None => view.remove(id),
                    };
                }
            }
        }
        view
    }

    async fn write(&self, uow: &UnitOfWork<u64>, record: &R) -> Result<()> {
        {
            let faults = self.faults.lock().unwrap();
            if faults.panic_code.as_deref() == Some(record.code()) {
                drop(faults);
                panic!("store exploded");
            }
            if faults.code.as_deref() == Some(record.code()) {
                return Err(RepositoryError::QueryFailed(
                    "constraint violation".to_string(),
                ));
            }
        }

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        match uow.handle() {
            Some(tx) => self
                .staged
                .lock()
                .unwrap()
                .entry(*tx)
                .or_default()
                .push((record.id(), Some(record.clone()))),
            None => {
                self.rows.lock().unwrap().insert(record.id(), record.clone());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<R: Record> MainStore<R> for MockStore<R> {
    type Tx = u64;

    async fn begin(&self) -> Result<u64> {
        let tx = self.next_tx.fetch_add(1, Ordering::SeqCst);
        self.staged.lock().unwrap().insert(tx, Vec::new());
        Ok(tx)
    }

    async fn commit(&self, tx: u64) -> Result<()> {
        let staged = self.staged.lock().unwrap().remove(&tx).unwrap_or_default();
        if self.faults.lock().unwrap().commits {
            return Err(RepositoryError::TransactionFailed(
                "commit refused".to_string(),
            ));
        }
        let mut rows = self.rows.lock().unwrap();
        for (id, change) in staged {
            match change {
                Some(record) => rows.insert(id, record),
                None => rows.remove(&id),
            };
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self, tx: u64) -> Result<()> {
        self.staged.lock().unwrap().remove(&tx);
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create(&self, uow: &UnitOfWork<u64>, record: &R) -> Result<()> {
        self.write(uow, record).await?;
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update(&self, uow: &UnitOfWork<u64>, record: &R) -> Result<()> {
        self.write(uow, record).await?;
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn find_by_id(&self, uow: &UnitOfWork<u64>, id: Uuid) -> Result<Option<R>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.faults.lock().unwrap().lookups {
            return Err(RepositoryError::ConnectionFailed(
                "connection reset".to_string(),
            ));
        }
        Ok(self.view(uow).remove(&id))
    }

    async fn find_by_filter(
        &self,
        uow: &UnitOfWork<u64>,
        filter: &RecordFilter,
        _lock: bool,
    ) -> Result<Vec<R>> {
        if self.faults.lock().unwrap().filters {
            return Err(RepositoryError::QueryFailed("relation missing".to_string()));
        }
        let mut records: Vec<R> = self
            .view(uow)
            .into_values()
            .filter(|r| filter.matches(r.id(), r.code()))
            .collect();
        records.sort_by(|a, b| a.code().cmp(b.code()));
        Ok(records)
    }

    async fn find_page(
        &self,
        uow: &UnitOfWork<u64>,
        filter: &RecordFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<R>> {
        let records = self.find_by_filter(uow, filter, false).await?;
        Ok(records
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn find_total_by_filter(
        &self,
        uow: &UnitOfWork<u64>,
        filter: &RecordFilter,
    ) -> Result<i64> {
        Ok(self.find_by_filter(uow, filter, false).await?.len() as i64)
    }

    async fn delete(&self, uow: &UnitOfWork<u64>, filter: &RecordFilter) -> Result<()> {
        match uow.handle() {
            Some(tx) => {
                let mut staged = self.staged.lock().unwrap();
                let changes = staged.entry(*tx).or_default();
                changes.extend(filter.ids.iter().map(|id| (*id, None)));
            }
            None => {
                let mut rows = self.rows.lock().unwrap();
                for id in &filter.ids {
                    rows.remove(id);
                }
            }
        }
        Ok(())
    }
}

/// Byte cache with hit and write counters.
#[derive(Default)]
pub struct MockCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
    panic_writes: AtomicBool,
    writes: AtomicUsize,
    hits: AtomicUsize,
}

impl MockCache {
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn panic_writes(&self) {
        self.panic_writes.store(true, Ordering::SeqCst);
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Cache for MockCache {
    async fn get(&self, key: &str) -> cache::Result<Option<Vec<u8>>> {
        let found = self.entries.lock().unwrap().get(key).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
        Ok(found)
    }

    async fn set(&self, key: &str, value: &[u8], _ttl: Option<Duration>) -> cache::Result<()> {
        if self.panic_writes.load(Ordering::SeqCst) {
            panic!("cache backend panicked");
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::ConnectionFailed("refused".to_string()));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &str) -> cache::Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

pub type TestService<R> = RecordService<R, MockStore<R>, MockCache>;

pub fn service<R: Record>() -> (TestService<R>, Arc<MockStore<R>>, Arc<MockCache>) {
    service_with(MockStore::default(), UpsertConfig::default())
}

pub fn service_with<R: Record>(
    store: MockStore<R>,
    config: UpsertConfig,
) -> (TestService<R>, Arc<MockStore<R>>, Arc<MockCache>) {
    let store = Arc::new(store);
    let cache = Arc::new(MockCache::default());
    let svc = RecordService::new(
        Arc::clone(&store),
        RecordCache::new(Arc::clone(&cache), DEFAULT_RECORD_TTL),
        CacheRefresher::new(8),
        config,
    );
    (svc, store, cache)
}

/// Waits until every background cache refresh has finished.
pub async fn settle(refresher: &CacheRefresher) {
    for _ in 0..100 {
        if refresher.in_flight() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("cache refreshes did not settle");
}
