//! Cache and domain errors

use thiserror::Error;

/// Failure modes of a single cache operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key absent or expired. Expected on every cold read.
    #[error("Key not found")]
    NotFound,

    #[error("Session not found")]
    SessionNotFound,

    /// Stored bytes did not match the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Cache store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation deadline exceeded")]
    DeadlineExceeded,
}

impl CacheError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound | CacheError::SessionNotFound)
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, CacheError::StoreUnavailable(_))
    }

    /// Caller-side abort. Never retried inside this layer.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, CacheError::Cancelled | CacheError::DeadlineExceeded)
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Decode(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Repository error: {0}")]
    Repository(String),

    #[error(transparent)]
    Cache(#[from] CacheError),
}
