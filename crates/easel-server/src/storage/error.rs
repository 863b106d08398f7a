//! Storage error types.

use thiserror::Error;

/// Errors returned by [`Storage`](super::Storage) implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Underlying I/O or database failure.
    ///
    /// May be transient (disk full, lock contention) or permanent
    /// (permissions). The in-memory state is unaffected either way.
    #[error("storage I/O error: {0}")]
    Io(String),

    /// Document could not be encoded or decoded.
    ///
    /// On read this means the persisted document is corrupt.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
