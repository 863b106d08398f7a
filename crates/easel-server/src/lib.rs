//! Easel canvas server.
//!
//! Room-scoped state for a collaborative canvas: every room owns an
//! append-only stroke history and a bounded chat history. Both live in
//! memory and are written back to durable storage in the background.
//!
//! # Architecture
//!
//! - [`RoomStore`]: per-room record histories with lazy load, a dirty set,
//!   and a periodic flusher. [`StrokeStore`] and [`ChatStore`] are its two
//!   instantiations.
//! - [`storage`]: the [`Storage`] trait and its backends (JSON files, redb,
//!   in-memory, fault-injecting).
//! - [`Canvas`]: both stores over one backend with a joint lifecycle.
//! - [`CanvasDriver`]: Sans-IO event processor for collaborating sessions
//!   (join, draw, clear, chat), built on [`SessionRegistry`].
//! - [`runtime`]: executes driver actions over line-delimited JSON streams.
//!
//! The store never fails a request because of storage: unreadable documents
//! load as empty rooms and failed writes are logged while memory stays the
//! source of truth.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod canvas;
mod config;
mod driver;
mod error;
pub mod protocol;
mod registry;
pub mod runtime;
pub mod storage;
pub mod store;
mod system_env;

pub use canvas::{Canvas, CanvasFlushReport};
pub use config::{Backend, REDB_FILE_NAME, ServerConfig};
pub use driver::{CanvasAction, CanvasDriver, CanvasEvent, LogLevel};
use easel_core::{RecordKind, RoomId};
pub use error::ServerError;
pub use registry::SessionRegistry;
pub use storage::{ChaoticStorage, FileStorage, MemoryStorage, RedbStorage, Storage, StorageError};
pub use store::{
    ChatStore, FlushReport, Retention, RoomStore, StoreConfig, StoreError, StrokeStore,
};
pub use system_env::SystemEnv;
use tokio::io::BufReader;

/// Rooms with a persisted document, per record kind, sorted.
///
/// # Errors
///
/// Returns the storage error if a backend listing fails.
pub fn persisted_rooms<S: Storage>(
    storage: &S,
) -> Result<Vec<(RecordKind, Vec<RoomId>)>, StorageError> {
    RecordKind::ALL
        .into_iter()
        .map(|kind| {
            let mut rooms = storage.list_rooms(kind)?;
            rooms.sort();
            Ok((kind, rooms))
        })
        .collect()
}

/// Serve the canvas protocol on stdin/stdout until EOF or Ctrl-C.
///
/// # Errors
///
/// See [`runtime::run`].
pub async fn run_stdio<S: Storage>(
    storage: S,
    config: &ServerConfig,
) -> Result<CanvasFlushReport, ServerError> {
    let canvas = Canvas::new(storage, SystemEnv::new(), config.stroke_store(), config.chat_store());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for Ctrl-C, relying on EOF");
            std::future::pending::<()>().await;
        }
    };

    runtime::run(canvas, BufReader::new(tokio::io::stdin()), tokio::io::stdout(), shutdown).await
}
