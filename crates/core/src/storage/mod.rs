mod error;
mod http_mapping;
mod pagination;
mod traits;
mod unit_of_work;

pub use error::{RepositoryError, Result};
pub use http_mapping::repository_error_to_status_code;
pub use pagination::{get_offset, Pagination};
pub use traits::MainStore;
pub use unit_of_work::{run_in_transaction, TransactionError, UnitOfWork};
