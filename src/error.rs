//! # Core Errors
//!
//! The error taxonomy shared by the cache, the service and the store
//! collaborators. `NotFound` is an expected outcome of a lookup, not a fault;
//! callers at the boundary map it to a not-found response.

/// Errors produced by the core (cache, service) and its store collaborators.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    /// The requested order is absent.
    #[error("Order not found: {0}")]
    NotFound(String),

    /// The caller gave up before the operation ran.
    #[error("Operation canceled")]
    Canceled,

    /// The caller's deadline passed before the operation ran.
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// The durable store failed to read or write.
    #[error("Storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Reserved for cache-side failures other than cancellation.
    #[error("Cache error: {0}")]
    Cache(String),
}

impl OrderError {
    /// Wraps any store-side failure.
    pub fn storage<E>(e: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        OrderError::Storage(e.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, OrderError::NotFound(_))
    }

    /// True for `Canceled` and `DeadlineExceeded`.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, OrderError::Canceled | OrderError::DeadlineExceeded)
    }
}

pub type Result<T, E = OrderError> = std::result::Result<T, E>;
