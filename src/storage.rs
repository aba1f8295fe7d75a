//! Storage

use thiserror::Error;

/// Errors raised by the keyed record stores backing repositories.
///
/// The pipeline treats storage as authoritative and synchronous, so these are never retried;
/// they propagate as fatal for the current operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A lock guarding an in-memory store was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    Poisoned,

    /// The backing store could not serve the request.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_error: std::sync::PoisonError<T>) -> Self {
        Self::Poisoned
    }
}
