mod error;
mod keys;
mod record_cache;
mod serialization;
mod traits;

pub use error::{CacheError, Result};
pub use keys::record_key;
pub use record_cache::{RecordCache, DEFAULT_RECORD_TTL};
pub use serialization::{deserialize_record, serialize_record};
pub use traits::Cache;
