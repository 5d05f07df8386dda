//! In-memory storage backend.
//!
//! Transactional with per-row pessimistic locks, so every upsert variant
//! behaves as it does against Postgres. Data lives for the life of the process.

mod locks;
mod repository;

pub use repository::{InMemoryRepository, InMemoryTx};
