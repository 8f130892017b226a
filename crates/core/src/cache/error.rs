//! Cache backend failures.
//!
//! None of these reach a repository caller: reads treat them as a miss and
//! background writes only log them.

use thiserror::Error;

use super::serialization::SerializationError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The backend could not be reached.
    #[error("cache backend unreachable: {0}")]
    ConnectionFailed(String),
    /// The backend was reached but did not carry out the command.
    #[error("cache command failed: {0}")]
    OperationFailed(String),
    /// A value could not be encoded, or a stored value did not decode into
    /// the requested type.
    #[error("cache value encoding: {0}")]
    Serialization(String),
}

impl CacheError {
    /// True when the backend itself is at fault rather than one stored value.
    pub fn is_backend(&self) -> bool {
        !matches!(self, Self::Serialization(_))
    }
}

impl From<SerializationError> for CacheError {
    fn from(err: SerializationError) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
