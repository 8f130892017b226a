use thiserror::Error;

use crate::id::ObjectIdError;

/// Errors that can occur during repository operations.
///
/// `NotFound`, `NotUpdated` and `NotDeleted` are outcomes callers branch on
/// ("create if missing" versus "abort on outage"); the remaining variants
/// describe backend failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Document not found")]
    NotFound,
    #[error("Document matched but was not updated")]
    NotUpdated,
    #[error("Document not deleted")]
    NotDeleted,
    #[error("Projection requires at least one selected or omitted field")]
    ProjectionRequired,
    #[error(transparent)]
    MalformedIdentifier(#[from] ObjectIdError),
    #[error("Document already exists: {id}")]
    AlreadyExists { id: String },
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Operation timed out")]
    Timeout,
}

impl RepositoryError {
    /// Returns true for the "nothing matched" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
