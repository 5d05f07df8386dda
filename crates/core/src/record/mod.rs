mod error;
mod operations;
mod requests;
mod types;

pub use error::ValidationError;
pub use operations::{validate_inputs, validate_page_query};
pub use requests::{OutputStatus, PageQuery, RecordFilter, UpsertInput, UpsertOutput};
pub use types::{Channel, Location, Record};
