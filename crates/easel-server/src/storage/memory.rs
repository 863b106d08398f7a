#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use easel_core::{Record, RecordKind, RoomId};

use super::{Codec, Storage, StorageError};

/// In-memory storage implementation for testing and simulation
///
/// Documents are kept as encoded JSON bytes, exactly as [`FileStorage`]
/// would write them, so decode failures can be exercised by planting raw
/// bytes with [`MemoryStorage::put_raw`]. All state is wrapped in
/// `Arc<Mutex<>>`, so clones observe the same documents.
///
/// [`FileStorage`]: super::FileStorage
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<HashMap<(RecordKind, RoomId), Vec<u8>>>>,
}

impl MemoryStorage {
    /// Create a new empty `MemoryStorage`
    pub fn new() -> Self {
        Self::default()
    }

    /// Plant raw document bytes for a room, bypassing encoding.
    pub fn put_raw(&self, kind: RecordKind, room_id: &RoomId, bytes: impl Into<Vec<u8>>) {
        self.lock().insert((kind, room_id.clone()), bytes.into());
    }

    /// Raw document bytes for a room, if any were written.
    pub fn raw(&self, kind: RecordKind, room_id: &RoomId) -> Option<Vec<u8>> {
        self.lock().get(&(kind, room_id.clone())).cloned()
    }

    /// Number of documents across all rooms and kinds.
    pub fn document_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(RecordKind, RoomId), Vec<u8>>> {
        // Every critical section is a single map operation, so a poisoned map
        // is still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for MemoryStorage {
    fn write_room<R: Record>(&self, room_id: &RoomId, records: &[R]) -> Result<(), StorageError> {
        let bytes = Codec::Json.encode(records)?;
        self.lock().insert((R::KIND, room_id.clone()), bytes);
        Ok(())
    }

    fn read_room<R: Record>(&self, room_id: &RoomId) -> Result<Option<Vec<R>>, StorageError> {
        let bytes = self.lock().get(&(R::KIND, room_id.clone())).cloned();
        bytes.map(|b| Codec::Json.decode(&b)).transpose()
    }

    fn list_rooms(&self, kind: RecordKind) -> Result<Vec<RoomId>, StorageError> {
        Ok(self.lock().keys().filter(|(k, _)| *k == kind).map(|(_, room)| room.clone()).collect())
    }
}
