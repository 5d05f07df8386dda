use thiserror::Error;

use crate::record::UpsertOutput;
use crate::storage::{RepositoryError, TransactionError};

use super::UpsertSummary;

/// Batch-level failure of an upsert.
#[derive(Debug, Error)]
pub enum UpsertError {
    /// One or more inputs failed or were skipped. Successful siblings stay
    /// applied (and committed, for the transactional variants).
    #[error("internal error")]
    ItemsFailed {
        outputs: Vec<UpsertOutput>,
        summary: UpsertSummary,
    },
    /// The enclosing transaction could not be opened, committed or finished.
    /// Nothing of the batch is visible.
    #[error("transaction failed: {0}")]
    Transaction(#[from] TransactionError<RepositoryError>),
    /// The bulk read of existing records failed before any unit ran.
    #[error("find existing records: {0}")]
    Prefetch(RepositoryError),
}

impl UpsertError {
    /// Per-item failure details. Empty for transaction failures.
    pub fn outputs(&self) -> &[UpsertOutput] {
        match self {
            UpsertError::ItemsFailed { outputs, .. } => outputs,
            UpsertError::Transaction(_) | UpsertError::Prefetch(_) => &[],
        }
    }
}
