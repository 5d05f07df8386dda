//! Storage backend implementations.
//!
//! This module provides concrete implementations of the [`MainStore`] trait
//! defined in `stockroom_core::storage`. The implementation is selected at
//! compile time via feature flags.
//!
//! # Feature Flags
//!
//! - `inmemory` (default): process-local store with row locks
//! - `postgres`: PostgreSQL store using `sqlx`
//!
//! These features are mutually exclusive - only one storage backend can be
//! enabled at a time.
//!
//! # Examples
//!
//! Build with Postgres:
//! ```bash
//! cargo build -p stockroom --no-default-features --features postgres,memory
//! ```
//!
//! [`MainStore`]: stockroom_core::storage::MainStore

// Compile-time checks for mutual exclusivity
#[cfg(all(feature = "inmemory", feature = "postgres"))]
compile_error!(
    "Features 'inmemory' and 'postgres' are mutually exclusive. \
    Enable only one storage backend at a time."
);

#[cfg(not(any(feature = "inmemory", feature = "postgres")))]
compile_error!(
    "No storage backend selected. Enable 'inmemory' or 'postgres' feature. \
    Example: cargo build -p stockroom --features inmemory"
);

#[cfg(feature = "inmemory")]
pub mod inmemory;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "inmemory")]
pub use inmemory::InMemoryRepository;

#[cfg(feature = "postgres")]
pub use postgres::PostgresRepository;
