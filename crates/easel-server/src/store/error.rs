//! Store lifecycle errors.

use thiserror::Error;

/// Errors from starting the background flusher.
///
/// Data-path operations never return these: validation produces a
/// [`Rejection`](easel_core::Rejection) and persistence a
/// [`StorageError`](crate::storage::StorageError).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// `start()` called while the flusher is already running
    #[error("background flusher already running")]
    AlreadyRunning,

    /// `start()` called outside a Tokio runtime
    #[error("no Tokio runtime available to run the flusher")]
    NoRuntime,

    /// Flush interval of zero
    #[error("flush interval must be non-zero")]
    ZeroInterval,
}
