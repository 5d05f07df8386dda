//! Bounded classify-and-apply over a batch of inputs.
//!
//! Every input becomes one unit. Units run as tasks gated by a counting
//! semaphore with `workers` permits; a unit holds its permit until its result
//! is queued, so re-acquiring every permit is the barrier for the batch.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;

use crate::cache::Cache;
use crate::record::{OutputStatus, Record, RecordFilter, UpsertInput, UpsertOutput};
use crate::storage::{run_in_transaction, MainStore, RepositoryError, UnitOfWork};

use super::{CancelSignal, RecordService, UpsertError};

/// How a batch is classified and applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertPolicy {
    /// Per-item lookup, no transaction. Two concurrent batches may both decide
    /// to create the same identity; the transactional variants close that race.
    Immediate,
    /// One locked bulk read up front, no transaction.
    PrefetchBatched,
    /// Locked bulk read and all writes in one transaction.
    Transactional,
    /// Like `Transactional`, with a fixed sleep per unit to provoke lock
    /// contention between overlapping batches.
    TransactionalLocked,
}

impl UpsertPolicy {
    pub const ALL: [UpsertPolicy; 4] = [
        UpsertPolicy::Immediate,
        UpsertPolicy::PrefetchBatched,
        UpsertPolicy::Transactional,
        UpsertPolicy::TransactionalLocked,
    ];

    pub fn name(self) -> &'static str {
        match self {
            UpsertPolicy::Immediate => "immediate",
            UpsertPolicy::PrefetchBatched => "prefetch_batched",
            UpsertPolicy::Transactional => "transactional",
            UpsertPolicy::TransactionalLocked => "transactional_locked",
        }
    }

    fn is_transactional(self) -> bool {
        matches!(
            self,
            UpsertPolicy::Transactional | UpsertPolicy::TransactionalLocked
        )
    }
}

/// Counts of a batch that went through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertSummary {
    pub created: usize,
    pub updated: usize,
}

enum UnitResult<R> {
    Created(R),
    Updated(R),
    Failed(UpsertOutput),
}

struct BatchOutcome<R> {
    created: Vec<R>,
    updated: Vec<R>,
    outputs: Vec<UpsertOutput>,
}

impl<R> Default for BatchOutcome<R> {
    fn default() -> Self {
        Self {
            created: Vec::new(),
            updated: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

impl<R: Record> BatchOutcome<R> {
    fn push(&mut self, result: UnitResult<R>) {
        match result {
            UnitResult::Created(record) => self.created.push(record),
            UnitResult::Updated(record) => self.updated.push(record),
            UnitResult::Failed(output) => self.outputs.push(output),
        }
    }

    fn summary(&self) -> UpsertSummary {
        UpsertSummary {
            created: self.created.len(),
            updated: self.updated.len(),
        }
    }

    fn into_result(self) -> Result<UpsertSummary, UpsertError> {
        let summary = self.summary();
        if self.outputs.is_empty() {
            Ok(summary)
        } else {
            Err(UpsertError::ItemsFailed {
                outputs: self.outputs,
                summary,
            })
        }
    }
}

/// When a successful unit's record is handed to the cache refresher.
#[derive(Clone, Copy)]
enum CacheMode {
    /// Inside the unit, once its result is known.
    Inline,
    /// After the enclosing transaction committed.
    Deferred,
}

impl<R, S, C> RecordService<R, S, C>
where
    R: Record,
    S: MainStore<R>,
    C: Cache + ?Sized,
{
    /// Applies a batch of inputs under `policy`.
    ///
    /// Returns the created/updated counts when every input went through.
    /// Otherwise returns [`UpsertError::ItemsFailed`] with one output per failed
    /// or skipped input; the other inputs stay applied. Transaction failures
    /// discard the batch entirely.
    ///
    /// `cancel` is only observed while waiting for a worker slot.
    pub async fn upsert(
        &self,
        policy: UpsertPolicy,
        inputs: Vec<UpsertInput>,
        cancel: &CancelSignal,
    ) -> Result<UpsertSummary, UpsertError> {
        let size = inputs.len();

        let outcome = if policy.is_transactional() {
            let delay = (policy == UpsertPolicy::TransactionalLocked).then_some(self.config.lock_delay);

            let committed = run_in_transaction::<R, S, _, _, _, _>(
                self.store.as_ref(),
                &UnitOfWork::None,
                |uow| async move {
                    let snapshot = self.prefetch(&uow, &inputs).await?;
                    let outcome = self
                        .dispatch(uow, Some(snapshot), inputs, delay, CacheMode::Deferred, cancel)
                        .await;
                    Ok::<_, RepositoryError>(outcome)
                },
            )
            .await;

            let outcome = match committed {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(
                        kind = R::KIND,
                        policy = policy.name(),
                        size,
                        error = %e,
                        "Upsert transaction failed"
                    );
                    return Err(e.into());
                }
            };

            for record in outcome.created.iter().chain(&outcome.updated) {
                self.refresher.refresh(self.cache.clone(), record.clone());
            }
            outcome
        } else {
            let uow = UnitOfWork::None;
            let snapshot = match policy {
                UpsertPolicy::PrefetchBatched => Some(
                    self.prefetch(&uow, &inputs)
                        .await
                        .map_err(UpsertError::Prefetch)?,
                ),
                _ => None,
            };
            self.dispatch(uow, snapshot, inputs, None, CacheMode::Inline, cancel)
                .await
        };

        let skipped = outcome
            .outputs
            .iter()
            .filter(|o| o.status == OutputStatus::Skipped)
            .count();
        tracing::info!(
            kind = R::KIND,
            policy = policy.name(),
            size,
            created = outcome.created.len(),
            updated = outcome.updated.len(),
            failed = outcome.outputs.len() - skipped,
            skipped,
            "Upsert batch finished"
        );

        outcome.into_result()
    }

    /// Reads every existing record named by the batch, locking the rows.
    async fn prefetch(
        &self,
        uow: &UnitOfWork<S::Tx>,
        inputs: &[UpsertInput],
    ) -> Result<Arc<HashMap<Uuid, R>>, RepositoryError> {
        let ids: Vec<Uuid> = inputs
            .iter()
            .map(|input| input.id)
            .filter(|id| !id.is_nil())
            .collect();

        // An empty id list would select everything.
        if ids.is_empty() {
            return Ok(Arc::default());
        }

        let existing = self
            .store
            .find_by_filter(uow, &RecordFilter::by_ids(ids), true)
            .await?;

        tracing::debug!(kind = R::KIND, found = existing.len(), "Prefetched existing records");

        Ok(Arc::new(
            existing.into_iter().map(|record| (record.id(), record)).collect(),
        ))
    }

    async fn dispatch(
        &self,
        uow: UnitOfWork<S::Tx>,
        snapshot: Option<Arc<HashMap<Uuid, R>>>,
        inputs: Vec<UpsertInput>,
        delay: Option<Duration>,
        cache_mode: CacheMode,
        cancel: &CancelSignal,
    ) -> BatchOutcome<R> {
        let workers = self.config.workers.max(1);
        let semaphore = Arc::new(Semaphore::new(workers as usize));
        let (results_tx, mut results_rx) = mpsc::channel(inputs.len().max(1));
        let mut outcome = BatchOutcome::default();

        for input in inputs {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err("cancelled while waiting for a worker slot"),
                permit = Arc::clone(&semaphore).acquire_owned() => {
                    permit.map_err(|_| "worker pool closed")
                }
            };

            let permit = match permit {
                Ok(permit) => permit,
                Err(reason) => {
                    tracing::warn!(
                        kind = R::KIND,
                        record_id = %input.id,
                        reason,
                        "Upsert input skipped"
                    );
                    outcome.outputs.push(UpsertOutput::skipped(&input, reason));
                    continue;
                }
            };

            let store = Arc::clone(&self.store);
            let uow = uow.clone();
            let snapshot = snapshot.clone();
            let cache = match cache_mode {
                CacheMode::Inline => Some((self.refresher.clone(), self.cache.clone())),
                CacheMode::Deferred => None,
            };
            let results_tx = results_tx.clone();

            tokio::spawn(async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }

                let result = AssertUnwindSafe(apply_unit(
                    store.as_ref(),
                    &uow,
                    snapshot.as_deref(),
                    &input,
                ))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    tracing::error!(kind = R::KIND, record_id = %input.id, "Upsert unit panicked");
                    UnitResult::Failed(UpsertOutput::failed(input.id, &input.code, "unit panicked"))
                });

                // Schedules the write only; the cache never runs on this task.
                if let (
                    Some((refresher, cache)),
                    UnitResult::Created(record) | UnitResult::Updated(record),
                ) = (cache, &result)
                {
                    refresher.refresh(cache, record.clone());
                }

                // Capacity equals the batch size, so this never waits.
                if results_tx.send(result).await.is_err() {
                    tracing::warn!(kind = R::KIND, record_id = %input.id, "Upsert result dropped");
                }
                drop(permit);
            });
        }

        let barrier = semaphore.acquire_many(workers).await;
        drop(results_tx);
        while let Some(result) = results_rx.recv().await {
            outcome.push(result);
        }
        drop(barrier);

        outcome
    }
}

/// Classifies one input and writes it.
async fn apply_unit<R, S>(
    store: &S,
    uow: &UnitOfWork<S::Tx>,
    snapshot: Option<&HashMap<Uuid, R>>,
    input: &UpsertInput,
) -> UnitResult<R>
where
    R: Record,
    S: MainStore<R> + ?Sized,
{
    let existing = match snapshot {
        Some(snapshot) => snapshot.get(&input.id).cloned(),
        None if input.id.is_nil() => None,
        None => match store.find_by_id(uow, input.id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(kind = R::KIND, record_id = %input.id, error = %e, "Lookup failed");
                return UnitResult::Failed(UpsertOutput::failed(
                    input.id,
                    &input.code,
                    e.root_cause(),
                ));
            }
        },
    };

    match existing {
        Some(mut record) => {
            record.apply(input);
            match store.update(uow, &record).await {
                Ok(()) => {
                    tracing::debug!(kind = R::KIND, record_id = %record.id(), "Updated");
                    UnitResult::Updated(record)
                }
                Err(e) => {
                    tracing::debug!(kind = R::KIND, record_id = %record.id(), error = %e, "Update failed");
                    UnitResult::Failed(UpsertOutput::failed(record.id(), record.code(), e.root_cause()))
                }
            }
        }
        None => {
            let record = R::from_input(input);
            match store.create(uow, &record).await {
                Ok(()) => {
                    tracing::debug!(kind = R::KIND, record_id = %record.id(), "Created");
                    UnitResult::Created(record)
                }
                Err(e) => {
                    tracing::debug!(kind = R::KIND, record_id = %record.id(), error = %e, "Create failed");
                    UnitResult::Failed(UpsertOutput::failed(record.id(), record.code(), e.root_cause()))
                }
            }
        }
    }
}
