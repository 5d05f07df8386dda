use thiserror::Error;

/// Errors raised when a caller-supplied payload is malformed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Item {index}: code cannot be empty")]
    EmptyCode { index: usize },
    #[error("Item {index}: code too long (max 255 characters)")]
    CodeTooLong { index: usize },
    #[error("Page must be at least 1")]
    InvalidPage,
    #[error("Limit must be between 1 and 1000")]
    InvalidLimit,
    #[error("Page is out of range")]
    PageOutOfRange,
}
