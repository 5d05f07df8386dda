//! Page arithmetic for the pagination endpoint.

use serde::{Deserialize, Serialize};

/// One page of items plus navigation metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub current_page: i64,
    pub next_page: i64,
    pub prev_page: i64,
    pub total_page: i64,
}

/// Returns the row offset of a 1-based page, or `None` if it does not fit in an i64.
fn checked_offset(page: i64, limit: i64) -> Option<i64> {
    page.checked_sub(1)?.checked_mul(limit)
}

/// Returns the row offset of a 1-based page, saturating on overflow.
pub fn get_offset(page: i64, limit: i64) -> i64 {
    checked_offset(page, limit).unwrap_or(i64::MAX)
}

impl<T> Pagination<T> {
    /// Builds the navigation metadata for `page` given the total match count.
    ///
    /// A non-positive `limit` is treated as 1.
    pub fn from_page(items: Vec<T>, total: i64, page: i64, limit: i64) -> Self {
        let per_page = limit.max(1);
        let total_page = total / per_page + i64::from(total % per_page != 0);
        let prev_page = if page > 1 { page - 1 } else { 1 };
        let next_page = if page < total_page { page + 1 } else { page };

        Self {
            items,
            total,
            limit,
            current_page: page,
            next_page,
            prev_page,
            total_page,
        }
    }
}
