use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use super::requests::UpsertInput;

/// A stored aggregate keyed by an immutable identity and carrying a natural code.
///
/// Channels and locations share this shape, so the engine, the store adapters and
/// the cache are written once against this trait.
pub trait Record:
    Debug + Clone + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Short lowercase name used in routes, cache keys and logs.
    const KIND: &'static str;

    /// Table backing this record in relational stores.
    const TABLE: &'static str;

    /// Rebuilds a record from its stored columns.
    fn from_parts(
        id: Uuid,
        code: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self;

    fn id(&self) -> Uuid;

    fn code(&self) -> &str;

    fn created_at(&self) -> DateTime<Utc>;

    fn updated_at(&self) -> DateTime<Utc>;

    /// Replaces the code and bumps `updated_at`.
    fn set_code(&mut self, code: String, now: DateTime<Utc>);

    /// Builds a new record for an input that matched nothing in the store.
    ///
    /// A nil input identity gets a fresh v4 UUID; a non-nil one is kept so that
    /// resubmitting the same batch updates instead of duplicating.
    fn from_input(input: &UpsertInput) -> Self {
        let id = if input.id.is_nil() {
            Uuid::new_v4()
        } else {
            input.id
        };
        let now = Utc::now();
        Self::from_parts(id, input.code.clone(), now, now)
    }

    /// Applies an input to an existing record.
    fn apply(&mut self, input: &UpsertInput) {
        self.set_code(input.code.clone(), Utc::now());
    }
}

macro_rules! define_record {
    ($(#[$meta:meta])* $name:ident, kind = $kind:literal, table = $table:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            pub id: Uuid,
            pub code: String,
            pub created_at: DateTime<Utc>,
            pub updated_at: DateTime<Utc>,
        }

        impl $name {
            /// Creates a new record with a fresh identity.
            pub fn new(code: impl Into<String>) -> Self {
                let now = Utc::now();
                Self {
                    id: Uuid::new_v4(),
                    code: code.into(),
                    created_at: now,
                    updated_at: now,
                }
            }

            /// Sets a specific ID (useful for testing).
            pub fn with_id(mut self, id: Uuid) -> Self {
                self.id = id;
                self
            }
        }

        impl Record for $name {
            const KIND: &'static str = $kind;
            const TABLE: &'static str = $table;

            fn from_parts(
                id: Uuid,
                code: String,
                created_at: DateTime<Utc>,
                updated_at: DateTime<Utc>,
            ) -> Self {
                Self {
                    id,
                    code,
                    created_at,
                    updated_at,
                }
            }

            fn id(&self) -> Uuid {
                self.id
            }

            fn code(&self) -> &str {
                &self.code
            }

            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }

            fn updated_at(&self) -> DateTime<Utc> {
                self.updated_at
            }

            fn set_code(&mut self, code: String, now: DateTime<Utc>) {
                self.code = code;
                self.updated_at = now;
            }
        }
    };
}

define_record!(
    /// A sales channel.
    Channel,
    kind = "channel",
    table = "channels"
);

define_record!(
    /// An inventory location.
    Location,
    kind = "location",
    table = "locations"
);
