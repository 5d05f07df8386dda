//! PostgreSQL schema definitions and SQL builders.
//!
//! Every record kind uses the same columns, so statements are built from the
//! table name. Pure string building, no I/O.

/// Column list shared by every select.
const COLUMNS: &str = "id, code, created_at, updated_at";

/// `$1` is the id list and `$2` the code list; a NULL list does not constrain.
const FILTER: &str = "($1::uuid[] IS NULL OR id = ANY($1)) AND ($2::text[] IS NULL OR code = ANY($2))";

pub const SAVEPOINT: &str = "SAVEPOINT upsert_item";
pub const RELEASE_SAVEPOINT: &str = "RELEASE SAVEPOINT upsert_item";
pub const ROLLBACK_TO_SAVEPOINT: &str = "ROLLBACK TO SAVEPOINT upsert_item";

pub fn create_table(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
    id UUID PRIMARY KEY,
    code TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
)"
    )
}

/// Binds `$1` id, `$2` code, `$3` created_at, `$4` updated_at.
pub fn insert(table: &str) -> String {
    format!("INSERT INTO {table} ({COLUMNS}) VALUES ($1, $2, $3, $4)")
}

/// Same binds as [`insert`].
pub fn update(table: &str) -> String {
    format!("UPDATE {table} SET code = $2, created_at = $3, updated_at = $4 WHERE id = $1")
}

pub fn select_by_id(table: &str) -> String {
    format!("SELECT {COLUMNS} FROM {table} WHERE id = $1")
}

pub fn select_by_filter(table: &str, lock: bool) -> String {
    let lock = if lock { " FOR UPDATE" } else { "" };
    format!("SELECT {COLUMNS} FROM {table} WHERE {FILTER} ORDER BY created_at, id{lock}")
}

/// `$3` is the offset and `$4` the limit.
pub fn select_page(table: &str) -> String {
    format!("SELECT {COLUMNS} FROM {table} WHERE {FILTER} ORDER BY created_at, id OFFSET $3 LIMIT $4")
}

pub fn count_by_filter(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {table} WHERE {FILTER}")
}

pub fn delete_by_ids(table: &str) -> String {
    format!("DELETE FROM {table} WHERE id = ANY($1)")
}
