//! Row conversion functions.
//!
//! Pure functions for converting between PostgreSQL rows and records.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use stockroom_core::record::{Record, RecordFilter};

/// Columns selected for every record: id, code, created_at, updated_at.
pub type RecordRow = (Uuid, String, DateTime<Utc>, DateTime<Utc>);

pub fn row_to_record<R: Record>((id, code, created_at, updated_at): RecordRow) -> R {
    R::from_parts(id, code, created_at, updated_at)
}

/// Filter lists as bind values; an empty list binds NULL.
pub fn filter_binds(filter: &RecordFilter) -> (Option<Vec<Uuid>>, Option<Vec<String>>) {
    let ids = (!filter.ids.is_empty()).then(|| filter.ids.clone());
    let codes = (!filter.codes.is_empty()).then(|| filter.codes.clone());
    (ids, codes)
}
