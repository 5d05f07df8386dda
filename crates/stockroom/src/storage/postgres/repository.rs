//! PostgreSQL repository implementation.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Transaction};
use tokio::sync::Mutex;
use uuid::Uuid;

use stockroom_core::record::{Record, RecordFilter};
use stockroom_core::storage::{MainStore, RepositoryError, Result, UnitOfWork};

use super::conversions::{filter_binds, row_to_record, RecordRow};
use super::error::map_sqlx_error;
use super::schema;

/// Opens a connection pool.
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))
}

/// Open transaction shared by the units of one batch.
///
/// The connection sits behind a mutex, so statements from concurrent units run
/// one after the other. `None` once committed or rolled back.
#[derive(Clone)]
pub struct PgTx {
    conn: Arc<Mutex<Option<Transaction<'static, Postgres>>>>,
}

fn closed_tx() -> RepositoryError {
    RepositoryError::TransactionFailed("transaction is already closed".to_string())
}

/// Runs `$body` against the transaction connection when `$uow` is active and
/// against the pool otherwise.
macro_rules! on_executor {
    ($self:ident, $uow:expr, |$exec:ident| $body:expr) => {
        match $uow.handle() {
            Some(tx) => {
                let mut guard = tx.conn.lock().await;
                let conn = guard.as_mut().ok_or_else(closed_tx)?;
                let $exec = &mut **conn;
                $body.await
            }
            None => {
                let $exec = &$self.pool;
                $body.await
            }
        }
    };
}

fn bind_record<'q, R: Record>(
    query: Query<'q, Postgres, PgArguments>,
    record: &R,
) -> Query<'q, Postgres, PgArguments> {
    query
        .bind(record.id())
        .bind(record.code().to_string())
        .bind(record.created_at())
        .bind(record.updated_at())
}

/// PostgreSQL-backed store for one record kind.
pub struct PostgresRepository<R> {
    pool: PgPool,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for PostgresRepository<R> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> PostgresRepository<R> {
    /// Creates a repository on `pool` and creates its table if absent.
    pub async fn new(pool: PgPool) -> Result<Self> {
        sqlx::query(&schema::create_table(R::TABLE))
            .execute(&pool)
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        tracing::info!(kind = R::KIND, table = R::TABLE, "Table ready");

        Ok(Self {
            pool,
            _record: PhantomData,
        })
    }

    /// Executes an insert or update and returns the affected row count.
    ///
    /// Inside a transaction the statement runs under a savepoint, so a failed
    /// item leaves the rest of the transaction usable.
    async fn write(&self, uow: &UnitOfWork<PgTx>, sql: &str, record: &R) -> Result<u64> {
        let id = record.id().to_string();
        let map = |e| map_sqlx_error(e, R::KIND, &id);

        match uow.handle() {
            Some(tx) => {
                let mut guard = tx.conn.lock().await;
                let conn = guard.as_mut().ok_or_else(closed_tx)?;

                sqlx::query(schema::SAVEPOINT)
                    .execute(&mut **conn)
                    .await
                    .map_err(map)?;

                match bind_record(sqlx::query(sql), record)
                    .execute(&mut **conn)
                    .await
                {
                    Ok(done) => {
                        sqlx::query(schema::RELEASE_SAVEPOINT)
                            .execute(&mut **conn)
                            .await
                            .map_err(map)?;
                        Ok(done.rows_affected())
                    }
                    Err(e) => {
                        sqlx::query(schema::ROLLBACK_TO_SAVEPOINT)
                            .execute(&mut **conn)
                            .await
                            .map_err(map)?;
                        Err(map(e))
                    }
                }
            }
            None => bind_record(sqlx::query(sql), record)
                .execute(&self.pool)
                .await
                .map(|done| done.rows_affected())
                .map_err(map),
        }
    }

    async fn finish(&self, tx: PgTx, commit: bool) -> Result<()> {
        let conn = tx.conn.lock().await.take().ok_or_else(closed_tx)?;
        let result = if commit {
            conn.commit().await
        } else {
            conn.rollback().await
        };
        result.map_err(|e| RepositoryError::TransactionFailed(e.to_string()))
    }
}

#[async_trait]
impl<R: Record> MainStore<R> for PostgresRepository<R> {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::TransactionFailed(e.to_string()))?;
        Ok(PgTx {
            conn: Arc::new(Mutex::new(Some(tx))),
        })
    }

    async fn commit(&self, tx: PgTx) -> Result<()> {
        self.finish(tx, true).await
    }

    async fn rollback(&self, tx: PgTx) -> Result<()> {
        self.finish(tx, false).await
    }

    async fn create(&self, uow: &UnitOfWork<PgTx>, record: &R) -> Result<()> {
        self.write(uow, &schema::insert(R::TABLE), record).await?;
        Ok(())
    }

    async fn update(&self, uow: &UnitOfWork<PgTx>, record: &R) -> Result<()> {
        let affected = self.write(uow, &schema::update(R::TABLE), record).await?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity_type: R::KIND,
                id: record.id().to_string(),
            });
        }
        Ok(())
    }

    async fn find_by_id(&self, uow: &UnitOfWork<PgTx>, id: Uuid) -> Result<Option<R>> {
        let sql = schema::select_by_id(R::TABLE);
        let query = sqlx::query_as::<_, RecordRow>(&sql).bind(id);

        let row = on_executor!(self, uow, |exec| query.fetch_optional(exec))
            .map_err(|e| map_sqlx_error(e, R::KIND, &id.to_string()))?;
        Ok(row.map(row_to_record))
    }

    async fn find_by_filter(
        &self,
        uow: &UnitOfWork<PgTx>,
        filter: &RecordFilter,
        lock: bool,
    ) -> Result<Vec<R>> {
        let sql = schema::select_by_filter(R::TABLE, lock);
        let (ids, codes) = filter_binds(filter);
        let query = sqlx::query_as::<_, RecordRow>(&sql).bind(ids).bind(codes);

        let rows = on_executor!(self, uow, |exec| query.fetch_all(exec))
            .map_err(|e| map_sqlx_error(e, R::KIND, "filter"))?;
        Ok(rows.into_iter().map(row_to_record).collect())
    }

    async fn find_page(
        &self,
        uow: &UnitOfWork<PgTx>,
        filter: &RecordFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<R>> {
        let sql = schema::select_page(R::TABLE);
        let (ids, codes) = filter_binds(filter);
        let query = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(ids)
            .bind(codes)
            .bind(offset)
            .bind(limit);

        let rows = on_executor!(self, uow, |exec| query.fetch_all(exec))
            .map_err(|e| map_sqlx_error(e, R::KIND, "page"))?;
        Ok(rows.into_iter().map(row_to_record).collect())
    }

    async fn find_total_by_filter(
        &self,
        uow: &UnitOfWork<PgTx>,
        filter: &RecordFilter,
    ) -> Result<i64> {
        let sql = schema::count_by_filter(R::TABLE);
        let (ids, codes) = filter_binds(filter);
        let query = sqlx::query_scalar::<_, i64>(&sql).bind(ids).bind(codes);

        on_executor!(self, uow, |exec| query.fetch_one(exec))
            .map_err(|e| map_sqlx_error(e, R::KIND, "total"))
    }

    async fn delete(&self, uow: &UnitOfWork<PgTx>, filter: &RecordFilter) -> Result<()> {
        // An empty id list must not turn into an unconstrained delete.
        if filter.ids.is_empty() {
            return Ok(());
        }

        let sql = schema::delete_by_ids(R::TABLE);
        let query = sqlx::query(&sql).bind(filter.ids.clone());

        on_executor!(self, uow, |exec| query.execute(exec))
            .map_err(|e| map_sqlx_error(e, R::KIND, "delete"))?;
        Ok(())
    }
}
