//! PostgreSQL storage backend implementation.
//!
//! Implements `MainStore` from `stockroom_core::storage` with `sqlx`. One
//! repository instance serves one record kind; all kinds share a pool.

mod conversions;
mod error;
mod repository;
mod schema;

pub use repository::{connect, PgTx, PostgresRepository};
