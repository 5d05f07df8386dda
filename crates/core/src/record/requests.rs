//! Batch request and response payloads.
//!
//! Shared between the server and the client. Pure data, no I/O.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One element of an upsert batch.
///
/// A nil `id` means "create".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertInput {
    #[serde(default)]
    pub id: Uuid,
    pub code: String,
}

impl UpsertInput {
    pub fn new(id: Uuid, code: impl Into<String>) -> Self {
        Self {
            id,
            code: code.into(),
        }
    }

    /// An input without identity.
    pub fn create(code: impl Into<String>) -> Self {
        Self::new(Uuid::nil(), code)
    }
}

/// Why an input ended up in the output list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStatus {
    /// The store rejected the item.
    #[default]
    Failed,
    /// The item never got a worker slot.
    Skipped,
}

/// Per-item failure detail of an upsert batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOutput {
    pub id: Uuid,
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub status: OutputStatus,
}

impl UpsertOutput {
    pub fn failed(id: Uuid, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id,
            code: code.into(),
            message: message.into(),
            status: OutputStatus::Failed,
        }
    }

    pub fn skipped(input: &UpsertInput, message: impl Into<String>) -> Self {
        Self {
            id: input.id,
            code: input.code.clone(),
            message: message.into(),
            status: OutputStatus::Skipped,
        }
    }
}

/// Selection used by the filter, page, total and delete operations.
///
/// Empty lists do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    #[serde(default)]
    pub ids: Vec<Uuid>,
    #[serde(default)]
    pub codes: Vec<String>,
}

impl RecordFilter {
    pub fn by_ids(ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            codes: Vec::new(),
        }
    }

    pub fn by_codes<S: Into<String>>(codes: impl IntoIterator<Item = S>) -> Self {
        Self {
            ids: Vec::new(),
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if a record with this id and code is selected.
    pub fn matches(&self, id: Uuid, code: &str) -> bool {
        (self.ids.is_empty() || self.ids.contains(&id))
            && (self.codes.is_empty() || self.codes.iter().any(|c| c == code))
    }
}

/// Query string of the pagination endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    25
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}
