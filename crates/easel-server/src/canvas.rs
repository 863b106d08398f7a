//! Stroke and chat stores over one storage backend.

use easel_core::{Environment, RoomId};

use crate::{
    SystemEnv,
    storage::{Storage, StorageError},
    store::{ChatStore, FlushReport, RoomStore, StoreConfig, StoreError, StrokeStore},
};

/// Final flush results of both stores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanvasFlushReport {
    /// Stroke store report
    pub strokes: FlushReport,
    /// Chat store report
    pub chat: FlushReport,
}

impl CanvasFlushReport {
    /// Whether both stores persisted everything.
    pub fn is_clean(&self) -> bool {
        self.strokes.is_clean() && self.chat.is_clean()
    }
}

/// The two per-room histories of a collaborative canvas.
///
/// Both stores share one storage backend (they use separate documents) and
/// one environment. Cloning is cheap.
#[derive(Clone)]
pub struct Canvas<S: Storage, E: Environment = SystemEnv> {
    strokes: StrokeStore<S, E>,
    chat: ChatStore<S, E>,
}

impl<S: Storage, E: Environment> Canvas<S, E> {
    /// Create both stores.
    pub fn new(storage: S, env: E, strokes: StoreConfig, chat: StoreConfig) -> Self {
        Self {
            strokes: RoomStore::new(storage.clone(), env.clone(), strokes),
            chat: RoomStore::new(storage, env, chat),
        }
    }

    /// Create both stores with their default configurations.
    pub fn with_defaults(storage: S, env: E) -> Self {
        Self::new(storage, env, StoreConfig::strokes(), StoreConfig::chat())
    }

    /// Stroke store.
    pub fn strokes(&self) -> &StrokeStore<S, E> {
        &self.strokes
    }

    /// Chat store.
    pub fn chat(&self) -> &ChatStore<S, E> {
        &self.chat
    }

    /// Start both background flushers.
    ///
    /// # Errors
    ///
    /// Returns the first [`StoreError`]. The stroke flusher may already be
    /// running when the chat flusher fails to start; `stop()` handles that.
    pub fn start(&self) -> Result<(), StoreError> {
        self.strokes.start()?;
        self.chat.start()
    }

    /// Stop both flushers and persist everything still dirty.
    pub async fn stop(&self) -> CanvasFlushReport {
        let (strokes, chat) = tokio::join!(self.strokes.stop(), self.chat.stop());
        CanvasFlushReport { strokes, chat }
    }

    /// Persist one room's strokes and chat now. Both are attempted.
    ///
    /// # Errors
    ///
    /// Returns the first storage error.
    pub fn flush_room(&self, room_id: &RoomId) -> Result<(), StorageError> {
        let strokes = self.strokes.flush(room_id);
        let chat = self.chat.flush(room_id);
        strokes.and(chat)
    }
}
