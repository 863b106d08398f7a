//! Server configuration.

use std::{num::NonZeroUsize, path::PathBuf, time::Duration};

use crate::store::{DEFAULT_CHAT_HISTORY, DEFAULT_FLUSH_INTERVAL, Retention, StoreConfig};

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Backend {
    /// One JSON file per room and kind (`<room>_board.json`, `<room>_chat.json`)
    #[default]
    File,
    /// Single redb database (`canvas.redb`) in the data directory
    Redb,
}

/// File name of the redb database inside the data directory.
pub const REDB_FILE_NAME: &str = "canvas.redb";

/// Configuration of the server process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Directory holding persisted room documents
    pub data_dir: PathBuf,
    /// Storage backend
    pub backend: Backend,
    /// Interval between background flush cycles (both stores)
    pub flush_interval: Duration,
    /// Chat messages retained per room
    pub chat_history: NonZeroUsize,
    /// Re-dirty rooms whose background write failed
    pub retry_failed_flushes: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            backend: Backend::File,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            chat_history: DEFAULT_CHAT_HISTORY,
            retry_failed_flushes: false,
        }
    }
}

impl ServerConfig {
    /// Stroke store configuration derived from this config.
    pub fn stroke_store(&self) -> StoreConfig {
        StoreConfig::strokes()
            .with_flush_interval(self.flush_interval)
            .with_retry_failed_flushes(self.retry_failed_flushes)
    }

    /// Chat store configuration derived from this config.
    pub fn chat_store(&self) -> StoreConfig {
        StoreConfig::chat()
            .with_flush_interval(self.flush_interval)
            .with_retention(Retention::KeepLatest(self.chat_history))
            .with_retry_failed_flushes(self.retry_failed_flushes)
    }
}
