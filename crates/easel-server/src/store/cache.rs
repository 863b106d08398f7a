//! Lock-protected cache state.
//!
//! Everything here runs with the store's lock held. Methods leave the maps
//! consistent after every statement, which is what makes recovering a
//! poisoned lock sound.

use std::collections::{HashMap, HashSet};

use easel_core::{Record, RoomId};

use super::Retention;
use crate::storage::Storage;

pub(super) struct CacheState<R> {
    /// Loaded rooms. A key is present iff the room was loaded (or created
    /// empty) by this store instance.
    rooms: HashMap<RoomId, Vec<R>>,
    /// Rooms with mutations not yet handed to storage. Always a subset of
    /// `rooms`' keys.
    dirty: HashSet<RoomId>,
}

impl<R: Record> CacheState<R> {
    /// Load `room_id` from storage unless already resident.
    ///
    /// Storage I/O happens under the caller's exclusive lock, which is what
    /// guarantees a single read per room.
    pub(super) fn ensure_loaded<S: Storage>(
        &mut self,
        storage: &S,
        room_id: &RoomId,
    ) -> &mut Vec<R> {
        self.rooms.entry(room_id.clone()).or_insert_with(|| load_room(storage, room_id))
    }
}

impl<R: Clone> CacheState<R> {
    pub(super) fn new() -> Self {
        Self { rooms: HashMap::new(), dirty: HashSet::new() }
    }

    pub(super) fn room(&self, room_id: &RoomId) -> Option<&Vec<R>> {
        self.rooms.get(room_id)
    }

    /// Append to a loaded room, trim, and mark it dirty. Returns the number
    /// of records the retention policy dropped.
    pub(super) fn append(&mut self, room_id: &RoomId, record: R, retention: Retention) -> usize {
        let records = self.rooms.entry(room_id.clone()).or_default();
        records.push(record);
        let dropped = retention.apply(records);
        self.dirty.insert(room_id.clone());
        dropped
    }

    /// Replace a room with an empty sequence and mark it dirty.
    pub(super) fn empty(&mut self, room_id: &RoomId) {
        self.rooms.insert(room_id.clone(), Vec::new());
        self.dirty.insert(room_id.clone());
    }

    /// Snapshot a room and clear its dirty flag in one step. `None` if the
    /// room was never loaded.
    pub(super) fn checkout(&mut self, room_id: &RoomId) -> Option<Vec<R>> {
        let snapshot = self.rooms.get(room_id)?.clone();
        self.dirty.remove(room_id);
        Some(snapshot)
    }

    pub(super) fn mark_dirty(&mut self, room_id: &RoomId) {
        if self.rooms.contains_key(room_id) {
            self.dirty.insert(room_id.clone());
        }
    }

    /// Swap the dirty set for an empty one.
    pub(super) fn take_dirty(&mut self) -> Vec<RoomId> {
        let mut rooms: Vec<RoomId> = std::mem::take(&mut self.dirty).into_iter().collect();
        rooms.sort();
        rooms
    }

    pub(super) fn is_dirty(&self, room_id: &RoomId) -> bool {
        self.dirty.contains(room_id)
    }

    pub(super) fn dirty_rooms(&self) -> Vec<RoomId> {
        let mut rooms: Vec<RoomId> = self.dirty.iter().cloned().collect();
        rooms.sort();
        rooms
    }

    pub(super) fn loaded_rooms(&self) -> Vec<RoomId> {
        let mut rooms: Vec<RoomId> = self.rooms.keys().cloned().collect();
        rooms.sort();
        rooms
    }
}

/// Read a room document, degrading any failure to an empty room.
fn load_room<R: Record, S: Storage>(storage: &S, room_id: &RoomId) -> Vec<R> {
    match storage.read_room::<R>(room_id) {
        Ok(Some(records)) => {
            tracing::info!(
                room_id = %room_id,
                kind = %R::KIND,
                records = records.len(),
                "room loaded"
            );
            records
        },
        Ok(None) => {
            tracing::debug!(room_id = %room_id, kind = %R::KIND, "new room");
            Vec::new()
        },
        Err(e) => {
            tracing::warn!(
                room_id = %room_id,
                kind = %R::KIND,
                error = %e,
                "failed to load room, starting empty"
            );
            Vec::new()
        },
    }
}
