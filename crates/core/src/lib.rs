//! Functional core and use cases of the stockroom service.
//!
//! - [`record`]: channel and location records, batch payloads, validation.
//! - [`storage`]: the transactional main store port and its unit of work.
//! - [`cache`]: the byte-level cache port and a typed record cache over it.
//! - [`service`]: the bounded upsert engine and the cache-aside read path.

pub mod cache;
pub mod record;
pub mod service;
pub mod storage;
