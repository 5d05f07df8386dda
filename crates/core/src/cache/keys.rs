use uuid::Uuid;

/// Returns the cache key of a single record, e.g. `"channel:{id}"`.
pub fn record_key(kind: &str, id: Uuid) -> String {
    format!("{}:{}", kind, id)
}
