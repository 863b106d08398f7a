//! Room-scoped, write-back record store.
//!
//! A [`RoomStore`] keeps every room it has touched in memory and treats
//! memory as the source of truth. Storage is written in the background:
//! mutations mark a room dirty and a periodic flush cycle persists each dirty
//! room from a snapshot. Readers never wait on disk once a room is resident.
//!
//! # Locking
//!
//! One `RwLock` per store guards the room map and the dirty set. Readers of a
//! resident room take the shared side. The first touch of a room takes the
//! exclusive side and reads storage while holding it, so concurrent first
//! touches cause exactly one read. Flush writes always happen with the lock
//! released, from a snapshot copied under it.
//!
//! Writes of one room are serialized by a per-room write lock, taken before
//! the snapshot and held until `write_room` returns. Snapshots of a room are
//! therefore written in the order they were taken, and a stale snapshot can
//! never land after a newer one (for example a background write racing a
//! `clear`). Lock order is write lock, then cache lock; never the reverse.
//!
//! # Failure model
//!
//! - Invalid input: a [`Rejection`] is returned, nothing changes
//! - Unreadable document: logged at `warn`, the room starts empty
//! - Failed write: logged at `error`, memory keeps the data

#![allow(clippy::disallowed_types, reason = "Store operations are synchronous and short")]

mod cache;
mod error;
mod flusher;
mod retention;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use easel_core::{ChatMessage, Environment, RawRecord, Record, Rejection, RoomId, Stroke};
pub use error::StoreError;
pub use retention::{DEFAULT_CHAT_HISTORY, DEFAULT_FLUSH_INTERVAL, Retention, StoreConfig};

use self::{cache::CacheState, flusher::FlusherHandle};
use crate::{
    SystemEnv,
    storage::{Storage, StorageError},
};

/// Store of drawing strokes.
pub type StrokeStore<S, E = SystemEnv> = RoomStore<Stroke, S, E>;

/// Store of chat messages.
pub type ChatStore<S, E = SystemEnv> = RoomStore<ChatMessage, S, E>;

/// Outcome of one flush cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Rooms written successfully
    pub persisted: usize,
    /// Rooms whose write failed, in room id order
    pub failed: Vec<RoomId>,
}

impl FlushReport {
    /// Whether every attempted write succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Per-room record histories with lazy load and write-back persistence.
///
/// Cloning is cheap and every clone operates on the same rooms. All data
/// operations are synchronous; only [`RoomStore::stop`] is async.
///
/// # Invariants
///
/// - A room is read from storage at most once per store instance
/// - Every dirty room is resident
/// - A mutation that happens after a room's snapshot was taken leaves the
///   room dirty, so the next cycle persists it
pub struct RoomStore<R: Record, S: Storage, E: Environment = SystemEnv> {
    shared: Arc<Shared<R, S, E>>,
}

impl<R: Record, S: Storage, E: Environment> Clone for RoomStore<R, S, E> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

struct Shared<R, S, E> {
    state: RwLock<CacheState<R>>,
    storage: S,
    env: E,
    config: StoreConfig,
    write_locks: Mutex<HashMap<RoomId, Arc<Mutex<()>>>>,
    flusher: Mutex<Option<FlusherHandle>>,
}

impl<R: Record, S: Storage, E: Environment> RoomStore<R, S, E> {
    /// Create a store. No storage access happens until a room is touched.
    pub fn new(storage: S, env: E, config: StoreConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(CacheState::new()),
                storage,
                env,
                config,
                write_locks: Mutex::new(HashMap::new()),
                flusher: Mutex::new(None),
            }),
        }
    }

    /// Storage backend.
    pub fn storage(&self) -> &S {
        &self.shared.storage
    }

    /// Store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }

    /// Independent copy of a room's records, oldest first.
    ///
    /// Loads the room on first touch.
    pub fn get_state(&self, room_id: &RoomId) -> Vec<R> {
        if let Some(records) = self.shared.read().room(room_id) {
            return records.clone();
        }

        let mut state = self.shared.write();
        state.ensure_loaded(&self.shared.storage, room_id).clone()
    }

    /// Validate `raw` and append it to the room.
    ///
    /// Returns the stored record (with defaults such as a chat timestamp
    /// filled in). On rejection the room is left untouched and not marked
    /// dirty.
    pub fn add_record(&self, room_id: &RoomId, raw: &RawRecord) -> Result<R, Rejection> {
        let mut state = self.shared.write();
        state.ensure_loaded(&self.shared.storage, room_id);

        let record = R::validate(raw, &self.shared.env)?;
        let dropped = state.append(room_id, record.clone(), self.shared.config.retention);
        drop(state);

        if dropped > 0 {
            tracing::debug!(room_id = %room_id, kind = %R::KIND, dropped, "history trimmed");
        }
        Ok(record)
    }

    /// Empty a room and persist it immediately.
    ///
    /// Never fails: a failed write is logged and the room stays dirty, so
    /// the flusher persists the empty room later.
    pub fn clear(&self, room_id: &RoomId) {
        self.shared.write().empty(room_id);
        tracing::debug!(room_id = %room_id, kind = %R::KIND, "room cleared");

        if let Err(e) = self.flush(room_id) {
            tracing::error!(
                room_id = %room_id,
                kind = %R::KIND,
                error = %e,
                "failed to persist cleared room"
            );
        }
    }

    /// Persist one room now.
    ///
    /// A room that was never loaded by this store is left alone, so a
    /// persisted document is never replaced by an empty one.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the write fails. The room is marked
    /// dirty again in that case.
    pub fn flush(&self, room_id: &RoomId) -> Result<(), StorageError> {
        match self.shared.persist(room_id) {
            None | Some(Ok(())) => Ok(()),
            Some(Err(e)) => {
                self.shared.write().mark_dirty(room_id);
                Err(e)
            },
        }
    }

    /// Run one flush cycle over every dirty room.
    ///
    /// This is what the background task runs on each tick. Blocking.
    pub fn flush_dirty(&self) -> FlushReport {
        self.shared.flush_dirty()
    }

    /// Start the background flusher on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// - `StoreError::AlreadyRunning` if started twice without `stop()`
    /// - `StoreError::NoRuntime` outside a Tokio runtime
    /// - `StoreError::ZeroInterval` for a zero flush interval
    pub fn start(&self) -> Result<(), StoreError> {
        let mut flusher = self.shared.flusher.lock().unwrap_or_else(PoisonError::into_inner);
        if flusher.is_some() {
            return Err(StoreError::AlreadyRunning);
        }

        let period = self.shared.config.flush_interval;
        *flusher = Some(FlusherHandle::spawn(Arc::downgrade(&self.shared), period)?);

        tracing::info!(kind = %R::KIND, interval_ms = period.as_millis(), "flusher started");
        Ok(())
    }

    /// Whether the background flusher is running.
    pub fn is_running(&self) -> bool {
        self.shared.flusher.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Stop the flusher and persist everything still dirty.
    ///
    /// Waits for an in-flight cycle before the final one. Safe to call when
    /// the flusher was never started: it still drains the dirty set.
    pub async fn stop(&self) -> FlushReport {
        let handle = self.shared.flusher.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            handle.shutdown().await;
            tracing::info!(kind = %R::KIND, "flusher stopped");
        }

        let shared = Arc::clone(&self.shared);
        match tokio::task::spawn_blocking(move || shared.flush_dirty()).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(kind = %R::KIND, error = %e, "final flush aborted");
                FlushReport::default()
            },
        }
    }

    /// Whether a room has unpersisted mutations.
    pub fn is_dirty(&self, room_id: &RoomId) -> bool {
        self.shared.read().is_dirty(room_id)
    }

    /// Rooms with unpersisted mutations, sorted.
    pub fn dirty_rooms(&self) -> Vec<RoomId> {
        self.shared.read().dirty_rooms()
    }

    /// Rooms resident in memory, sorted.
    pub fn loaded_rooms(&self) -> Vec<RoomId> {
        self.shared.read().loaded_rooms()
    }
}

impl<R: Record, S: Storage, E: Environment> Shared<R, S, E> {
    fn read(&self) -> RwLockReadGuard<'_, CacheState<R>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState<R>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self, room_id: &RoomId) -> Arc<Mutex<()>> {
        let mut locks = self.write_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(room_id.clone()).or_default())
    }

    /// Snapshot a resident room and write it, holding the room's write lock
    /// throughout. The dirty flag is cleared with the snapshot, so a
    /// mutation during the write marks the room dirty again. `None` if the
    /// room is not resident.
    fn persist(&self, room_id: &RoomId) -> Option<Result<(), StorageError>> {
        let lock = self.write_lock(room_id);
        let _order = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let snapshot = self.write().checkout(room_id)?;
        Some(self.storage.write_room(room_id, &snapshot))
    }

    fn flush_dirty(&self) -> FlushReport {
        let started = self.env.now();
        let drained = self.write().take_dirty();
        let mut report = FlushReport::default();

        for room_id in drained {
            match self.persist(&room_id) {
                None => {},
                Some(Ok(())) => report.persisted += 1,
                Some(Err(e)) => {
                    tracing::error!(
                        room_id = %room_id,
                        kind = %R::KIND,
                        error = %e,
                        retry = self.config.retry_failed_flushes,
                        "failed to persist room"
                    );
                    if self.config.retry_failed_flushes {
                        self.write().mark_dirty(&room_id);
                    }
                    report.failed.push(room_id);
                },
            }
        }

        if report.persisted > 0 || !report.failed.is_empty() {
            tracing::debug!(
                kind = %R::KIND,
                persisted = report.persisted,
                failed = report.failed.len(),
                elapsed_us = (self.env.now() - started).as_micros(),
                "flush cycle complete"
            );
        }
        report
    }
}
