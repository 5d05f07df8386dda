//! Transactional registry.
//!
//! [`run_in_transaction`] wraps a unit of work in a begin/commit/rollback
//! boundary. Whether a caller is already inside a transaction is carried by the
//! [`UnitOfWork`] value it passes around, so nesting reuses the open handle
//! instead of starting a second transaction.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use thiserror::Error;

use crate::record::Record;

use super::{MainStore, RepositoryError};

/// Transaction scope of a store call.
#[derive(Debug, Clone, Default)]
pub enum UnitOfWork<T> {
    /// Each statement runs on its own.
    #[default]
    None,
    /// Statements join this open transaction.
    Active(T),
}

impl<T> UnitOfWork<T> {
    /// Returns the open transaction handle, if any.
    pub fn handle(&self) -> Option<&T> {
        match self {
            UnitOfWork::None => None,
            UnitOfWork::Active(tx) => Some(tx),
        }
    }
}

/// Errors produced by [`run_in_transaction`].
///
/// `E` is the error type of the wrapped work.
#[derive(Debug, Error)]
pub enum TransactionError<E> {
    #[error("begin transaction: {0}")]
    Begin(RepositoryError),
    #[error("{0}")]
    Work(E),
    #[error("{cause} (rollback failed: {rollback})")]
    Rollback { cause: E, rollback: RepositoryError },
    #[error("commit transaction: {0}")]
    Commit(RepositoryError),
    #[error("transaction aborted by panic: {0}")]
    Panicked(String),
}

impl<E> TransactionError<E> {
    /// The work error, if the work itself failed.
    pub fn work_error(&self) -> Option<&E> {
        match self {
            TransactionError::Work(cause) | TransactionError::Rollback { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Runs `work` inside a transaction of `store`.
///
/// - With `UnitOfWork::Active` the handle is reused as is; the outermost caller
///   owns commit and rollback.
/// - Otherwise a transaction is opened and exactly one of commit or rollback runs
///   on every exit path. A work error rolls back; a failing rollback is attached
///   to the original cause. Success commits; a failing commit replaces the result.
///   A panic inside `work` rolls back and is returned as
///   [`TransactionError::Panicked`].
pub async fn run_in_transaction<R, S, F, Fut, T, E>(
    store: &S,
    uow: &UnitOfWork<S::Tx>,
    work: F,
) -> Result<T, TransactionError<E>>
where
    R: Record,
    S: MainStore<R> + ?Sized,
    F: FnOnce(UnitOfWork<S::Tx>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if let UnitOfWork::Active(tx) = uow {
        tracing::trace!(kind = R::KIND, "Reusing open transaction");
        return work(UnitOfWork::Active(tx.clone()))
            .await
            .map_err(TransactionError::Work);
    }

    let tx = store.begin().await.map_err(TransactionError::Begin)?;
    let scoped = UnitOfWork::Active(tx.clone());

    let outcome = AssertUnwindSafe(async move { work(scoped).await })
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(value)) => {
            store.commit(tx).await.map_err(TransactionError::Commit)?;
            Ok(value)
        }
        Ok(Err(cause)) => match store.rollback(tx).await {
            Ok(()) => Err(TransactionError::Work(cause)),
            Err(rollback) => {
                tracing::error!(kind = R::KIND, error = %rollback, "Rollback failed");
                Err(TransactionError::Rollback { cause, rollback })
            }
        },
        Err(panic) => {
            if let Err(rollback) = store.rollback(tx).await {
                tracing::error!(kind = R::KIND, error = %rollback, "Rollback after panic failed");
            }
            Err(TransactionError::Panicked(panic_message(panic)))
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::record::{Channel, RecordFilter};
    use crate::storage::Result;

    /// Store that only records transaction boundaries.
    #[derive(Default)]
    struct BoundaryStore {
        begins: AtomicUsize,
        commits: AtomicUsize,
        rollbacks: AtomicUsize,
        fail_commit: bool,
        fail_rollback: bool,
        seen: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl MainStore<Channel> for BoundaryStore {
        type Tx = u64;

        async fn begin(&self) -> Result<u64> {
            Ok(self.begins.fetch_add(1, Ordering::SeqCst) as u64 + 1)
        }

        async fn commit(&self, _tx: u64) -> Result<()> {
            self.commits.fetch_add(1, Ordering::SeqCst);
            if self.fail_commit {
                return Err(RepositoryError::TransactionFailed("commit refused".into()));
            }
            Ok(())
        }

        async fn rollback(&self, _tx: u64) -> Result<()> {
            self.rollbacks.fetch_add(1, Ordering::SeqCst);
            if self.fail_rollback {
                return Err(RepositoryError::TransactionFailed("rollback refused".into()));
            }
            Ok(())
        }

        async fn create(&self, uow: &UnitOfWork<u64>, _record: &Channel) -> Result<()> {
            if let Some(tx) = uow.handle() {
                self.seen.lock().unwrap().push(*tx);
            }
            Ok(())
        }

        async fn update(&self, _uow: &UnitOfWork<u64>, _record: &Channel) -> Result<()> {
            Ok(())
        }

        async fn find_by_id(&self, _uow: &UnitOfWork<u64>, _id: Uuid) -> Result<Option<Channel>> {
            Ok(None)
        }

        async fn find_by_filter(
            &self,
            _uow: &UnitOfWork<u64>,
            _filter: &RecordFilter,
            _lock: bool,
        ) -> Result<Vec<Channel>> {
            Ok(Vec::new())
        }

        async fn find_page(
            &self,
            _uow: &UnitOfWork<u64>,
            _filter: &RecordFilter,
            _offset: i64,
            _limit: i64,
        ) -> Result<Vec<Channel>> {
            Ok(Vec::new())
        }

        async fn find_total_by_filter(
            &self,
            _uow: &UnitOfWork<u64>,
            _filter: &RecordFilter,
        ) -> Result<i64> {
            Ok(0)
        }

        async fn delete(&self, _uow: &UnitOfWork<u64>, _filter: &RecordFilter) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_success_commits_once() {
        let store = BoundaryStore::default();

        let result: std::result::Result<u32, TransactionError<String>> =
            run_in_transaction(&store, &UnitOfWork::None, |uow| async move {
                assert!(uow.handle().is_some());
                Ok::<u32, String>(7)
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(store.begins.load(Ordering::SeqCst), 1);
        assert_eq!(store.commits.load(Ordering::SeqCst), 1);
        assert_eq!(store.rollbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_work_error_rolls_back() {
        let store = BoundaryStore::default();

        let result: std::result::Result<(), TransactionError<String>> =
            run_in_transaction(&store, &UnitOfWork::None, |_uow| async move {
                Err::<(), String>("boom".to_string())
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, TransactionError::Work(ref cause) if cause == "boom"));
        assert_eq!(store.commits.load(Ordering::SeqCst), 0);
        assert_eq!(store.rollbacks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rollback_failure_keeps_original_cause() {
        let store = BoundaryStore {
            fail_rollback: true,
            ..Default::default()
        };

        let result: std::result::Result<(), TransactionError<String>> =
            run_in_transaction(&store, &UnitOfWork::None, |_uow| async move {
                Err::<(), String>("boom".to_string())
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.work_error().map(String::as_str), Some("boom"));
        assert_eq!(
            err.to_string(),
            "boom (rollback failed: Transaction failed: rollback refused)"
        );
    }

    #[tokio::test]
    async fn test_commit_failure_overrides_success() {
        let store = BoundaryStore {
            fail_commit: true,
            ..Default::default()
        };

        let result: std::result::Result<u32, TransactionError<String>> =
            run_in_transaction(&store, &UnitOfWork::None, |_uow| async move {
                Ok::<u32, String>(1)
            })
            .await;

        assert!(matches!(result, Err(TransactionError::Commit(_))));
        assert_eq!(store.rollbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panic_rolls_back_and_becomes_error() {
        let store = BoundaryStore::default();

        let result: std::result::Result<(), TransactionError<String>> =
            run_in_transaction(&store, &UnitOfWork::None, |_uow| async move {
                let explode = true;
                if explode {
                    panic!("work exploded");
                }
                Ok::<(), String>(())
            })
            .await;

        match result {
            Err(TransactionError::Panicked(msg)) => assert_eq!(msg, "work exploded"),
            other => panic!("Expected Panicked, got {other:?}"),
        }
        assert_eq!(store.rollbacks.load(Ordering::SeqCst), 1);
        assert_eq!(store.commits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_nested_call_reuses_open_transaction() {
        let store = BoundaryStore::default();

        let result: std::result::Result<(), TransactionError<RepositoryError>> =
            run_in_transaction(&store, &UnitOfWork::None, |outer| {
                let store = &store;
                async move {
                    store.create(&outer, &Channel::new("A")).await?;
                    run_in_transaction(store, &outer, |inner| async move {
                        store.create(&inner, &Channel::new("B")).await
                    })
                    .await
                    .map_err(|e| match e {
                        TransactionError::Work(err) => err,
                        other => RepositoryError::TransactionFailed(other.to_string()),
                    })
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(store.begins.load(Ordering::SeqCst), 1);
        assert_eq!(store.commits.load(Ordering::SeqCst), 1);
        assert_eq!(*store.seen.lock().unwrap(), vec![1, 1]);
    }
}
