//! stockroom_client - CLI client for the stockroom API.

pub mod cli;
pub mod client;
pub mod error;
pub mod output;

pub use client::StockroomClient;
pub use error::{ClientError, Result};
