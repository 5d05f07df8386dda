//! Typed cache store for one record kind over a byte-level [`Cache`].

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::record::Record;

use super::{deserialize_record, record_key, serialize_record, Cache, Result};

/// Thirty days.
pub const DEFAULT_RECORD_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Cache store keyed by record identity.
pub struct RecordCache<R, C: ?Sized> {
    cache: Arc<C>,
    ttl: Duration,
    _record: PhantomData<fn() -> R>,
}

impl<R, C: ?Sized> Clone for RecordCache<R, C> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            ttl: self.ttl,
            _record: PhantomData,
        }
    }
}

impl<R: Record, C: Cache + ?Sized> RecordCache<R, C> {
    pub fn new(cache: Arc<C>, ttl: Duration) -> Self {
        Self {
            cache,
            ttl,
            _record: PhantomData,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached record, or `None` on a miss.
    pub async fn get(&self, id: Uuid) -> Result<Option<R>> {
        match self.cache.get(&record_key(R::KIND, id)).await? {
            Some(bytes) => deserialize_record(&bytes).map(Some),
            None => Ok(None),
        }
    }

    pub async fn set(&self, record: &R) -> Result<()> {
        let bytes = serialize_record(record)?;
        self.cache
            .set(&record_key(R::KIND, record.id()), &bytes, Some(self.ttl))
            .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.cache.delete(&record_key(R::KIND, id)).await
    }
}
