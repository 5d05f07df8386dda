use uuid::Uuid;

use crate::cache::Cache;
use crate::record::{PageQuery, Record, RecordFilter};
use crate::storage::{get_offset, MainStore, Pagination, Result, UnitOfWork};

use super::RecordService;

impl<R, S, C> RecordService<R, S, C>
where
    R: Record,
    S: MainStore<R>,
    C: Cache + ?Sized,
{
    /// Cache-aside point lookup.
    ///
    /// A hit returns without touching the store. A miss or a cache error falls
    /// through to the store, and a found record is written back in the
    /// background; the read never waits for that write.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<R>> {
        match self.cache.get(id).await {
            Ok(Some(record)) => {
                tracing::trace!(kind = R::KIND, record_id = %id, "Cache hit");
                return Ok(Some(record));
            }
            Ok(None) => tracing::trace!(kind = R::KIND, record_id = %id, "Cache miss"),
            Err(e) => {
                tracing::warn!(kind = R::KIND, record_id = %id, error = %e, "Cache read failed")
            }
        }

        let found = self.store.find_by_id(&UnitOfWork::None, id).await?;
        if let Some(record) = &found {
            self.refresher.refresh(self.cache.clone(), record.clone());
        }
        Ok(found)
    }

    /// Lists matching records straight from the store, without locking.
    pub async fn find_by_filter(&self, filter: &RecordFilter) -> Result<Vec<R>> {
        self.store
            .find_by_filter(&UnitOfWork::None, filter, false)
            .await
    }

    /// Returns one page of matching records.
    pub async fn find_page(&self, filter: &RecordFilter, query: PageQuery) -> Result<Pagination<R>> {
        let uow = UnitOfWork::None;
        let items = self
            .store
            .find_page(&uow, filter, get_offset(query.page, query.limit), query.limit)
            .await?;
        let total = self.store.find_total_by_filter(&uow, filter).await?;

        Ok(Pagination::from_page(items, total, query.page, query.limit))
    }

    /// Deletes the records whose ids are listed in `filter`.
    ///
    /// The cache is not invalidated; cached copies live until their TTL runs out.
    pub async fn delete(&self, filter: &RecordFilter) -> Result<()> {
        self.store.delete(&UnitOfWork::None, filter).await?;
        tracing::info!(kind = R::KIND, count = filter.ids.len(), "Deleted records");
        Ok(())
    }
}
