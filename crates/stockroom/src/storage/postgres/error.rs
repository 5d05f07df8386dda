//! PostgreSQL error mapping.
//!
//! Maps `sqlx::Error` to `RepositoryError` from `stockroom_core::storage`.

use stockroom_core::storage::RepositoryError;

/// Maps a sqlx error to a RepositoryError.
///
/// # Error Mapping
///
/// - Unique violations → `RepositoryError::AlreadyExists`
/// - Pool and I/O errors → `RepositoryError::ConnectionFailed`
/// - Decode errors → `RepositoryError::Serialization`
/// - Other database errors → `RepositoryError::QueryFailed` with the server message
pub fn map_sqlx_error(err: sqlx::Error, entity_type: &'static str, id: &str) -> RepositoryError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::AlreadyExists {
            entity_type,
            id: id.to_string(),
        },
        sqlx::Error::Database(db) => RepositoryError::QueryFailed(db.message().to_string()),
        sqlx::Error::RowNotFound => RepositoryError::NotFound {
            entity_type,
            id: id.to_string(),
        },
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::ConnectionFailed(err.to_string())
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            RepositoryError::Serialization(err.to_string())
        }
        other => RepositoryError::QueryFailed(other.to_string()),
    }
}
