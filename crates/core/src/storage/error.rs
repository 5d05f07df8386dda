use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
    #[error("{entity_type} already exists: {id}")]
    AlreadyExists {
        entity_type: &'static str,
        id: String,
    },
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl RepositoryError {
    /// The driver-level message without the variant prefix.
    ///
    /// Upsert outputs carry this instead of the full display string.
    pub fn root_cause(&self) -> String {
        match self {
            RepositoryError::NotFound { entity_type, id } => {
                format!("{entity_type} not found: {id}")
            }
            RepositoryError::AlreadyExists { entity_type, id } => {
                format!("{entity_type} already exists: {id}")
            }
            RepositoryError::ConnectionFailed(msg)
            | RepositoryError::QueryFailed(msg)
            | RepositoryError::TransactionFailed(msg)
            | RepositoryError::Serialization(msg)
            | RepositoryError::InvalidData(msg) => msg.clone(),
        }
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
