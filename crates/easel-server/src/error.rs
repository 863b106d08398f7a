//! Server error types.

use thiserror::Error;

use crate::{storage::StorageError, store::StoreError};

/// Errors that can stop the server process.
///
/// None of these come from serving a single client: rejected records and
/// failed flushes are logged and the server keeps going.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration error (unusable data directory, bad flag values).
    ///
    /// Fatal at startup. Fix configuration and restart.
    #[error("configuration error: {0}")]
    Config(String),

    /// Reading the input stream or writing the output stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Background flusher could not be started.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Storage backend could not be opened or listed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
