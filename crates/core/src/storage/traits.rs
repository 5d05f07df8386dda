use async_trait::async_trait;
use uuid::Uuid;

use crate::record::{Record, RecordFilter};

use super::{Result, UnitOfWork};

/// Transactional main store for one record type.
///
/// Every data operation receives the caller's [`UnitOfWork`]. With
/// `UnitOfWork::None` the statement runs on its own; with
/// `UnitOfWork::Active(tx)` it joins the open transaction. Implementations must
/// tolerate concurrent calls sharing one transaction handle.
#[async_trait]
pub trait MainStore<R: Record>: Send + Sync + 'static {
    /// Handle bound to an open transaction.
    type Tx: Clone + Send + Sync + 'static;

    /// Opens a new transaction.
    async fn begin(&self) -> Result<Self::Tx>;

    /// Commits a transaction opened by [`MainStore::begin`].
    async fn commit(&self, tx: Self::Tx) -> Result<()>;

    /// Rolls back a transaction opened by [`MainStore::begin`].
    async fn rollback(&self, tx: Self::Tx) -> Result<()>;

    /// Inserts a new record.
    async fn create(&self, uow: &UnitOfWork<Self::Tx>, record: &R) -> Result<()>;

    /// Updates an existing record.
    async fn update(&self, uow: &UnitOfWork<Self::Tx>, record: &R) -> Result<()>;

    /// Gets a record by its ID.
    async fn find_by_id(&self, uow: &UnitOfWork<Self::Tx>, id: Uuid) -> Result<Option<R>>;

    /// Gets all records matching a filter.
    ///
    /// With `lock` set the matched rows are locked pessimistically until the
    /// enclosing transaction ends (`SELECT ... FOR UPDATE`). Without a
    /// transaction the lock only lasts for the read itself.
    async fn find_by_filter(
        &self,
        uow: &UnitOfWork<Self::Tx>,
        filter: &RecordFilter,
        lock: bool,
    ) -> Result<Vec<R>>;

    /// Gets one page of records matching a filter.
    async fn find_page(
        &self,
        uow: &UnitOfWork<Self::Tx>,
        filter: &RecordFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<R>>;

    /// Counts the records matching a filter.
    async fn find_total_by_filter(
        &self,
        uow: &UnitOfWork<Self::Tx>,
        filter: &RecordFilter,
    ) -> Result<i64>;

    /// Deletes the records whose IDs are listed in the filter.
    async fn delete(&self, uow: &UnitOfWork<Self::Tx>, filter: &RecordFilter) -> Result<()>;
}
