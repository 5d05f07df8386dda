//! Pure functions for serializing records to and from cache bytes.
//!
//! Values are stored as JSON so they stay readable with `redis-cli`.

use crate::record::Record;

use super::{CacheError, Result};

/// Serializes a record to JSON bytes.
pub fn serialize_record<R: Record>(record: &R) -> Result<Vec<u8>> {
    serde_json::to_vec(record).map_err(|e| CacheError::Serialization(e.to_string()))
}

/// Deserializes JSON bytes to a record.
pub fn deserialize_record<R: Record>(bytes: &[u8]) -> Result<R> {
    serde_json::from_slice(bytes).map_err(|e| CacheError::Serialization(e.to_string()))
}
