use thiserror::Error;

use crate::repository::StoreError;

/// Stable failure classes callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    ResourceExhausted,
    Internal,
}

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ResourceExhausted(String),

    /// Aborted by lock timeout or deadlock; classified as internal but safe
    /// for the caller to retry.
    #[error("allocation aborted by a concurrent order: {0}")]
    Contention(StoreError),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Store(StoreError),
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            OrderError::NotFound(_) => ErrorKind::NotFound,
            OrderError::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            OrderError::Contention(_) | OrderError::Internal(_) | OrderError::Store(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, OrderError::Contention(_))
    }
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        if err.is_contention() {
            OrderError::Contention(err)
        } else {
            OrderError::Store(err)
        }
    }
}
