//! Redb-backed durable storage implementation.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety: a room
//! document is replaced in a single write transaction, so a crash leaves
//! either the old document or the new one.

use std::{path::Path, sync::Arc};

use easel_core::{Record, RecordKind, RoomId};
use redb::{Database, ReadableTable, TableDefinition};

use super::{Codec, Storage, StorageError};

/// Table: board
/// Key: room id
/// Value: CBOR-encoded array of strokes
const STROKES: TableDefinition<&str, &[u8]> = TableDefinition::new("board");

/// Table: chat
/// Key: room id
/// Value: CBOR-encoded array of chat messages
const CHAT: TableDefinition<&str, &[u8]> = TableDefinition::new("chat");

const fn table(kind: RecordKind) -> TableDefinition<'static, &'static str, &'static [u8]> {
    match kind {
        RecordKind::Stroke => STROKES,
        RecordKind::Chat => CHAT,
    }
}

/// Durable storage backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbStorage {
    db: Arc<Database>,
}

impl RedbStorage {
    /// Open or create a Redb database at the given path.
    ///
    /// Creates both tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(|e| StorageError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;
        for kind in RecordKind::ALL {
            let _ = txn.open_table(table(kind)).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl Storage for RedbStorage {
    fn write_room<R: Record>(&self, room_id: &RoomId, records: &[R]) -> Result<(), StorageError> {
        let bytes = Codec::Cbor.encode(records)?;

        let txn = self.db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;
        {
            let mut t =
                txn.open_table(table(R::KIND)).map_err(|e| StorageError::Io(e.to_string()))?;
            t.insert(room_id.as_str(), bytes.as_slice())
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(())
    }

    fn read_room<R: Record>(&self, room_id: &RoomId) -> Result<Option<Vec<R>>, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;
        let t = txn.open_table(table(R::KIND)).map_err(|e| StorageError::Io(e.to_string()))?;

        let Some(guard) = t.get(room_id.as_str()).map_err(|e| StorageError::Io(e.to_string()))?
        else {
            return Ok(None);
        };

        Codec::Cbor.decode(guard.value()).map(Some)
    }

    fn list_rooms(&self, kind: RecordKind) -> Result<Vec<RoomId>, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;
        let t = txn.open_table(table(kind)).map_err(|e| StorageError::Io(e.to_string()))?;

        let mut rooms = Vec::new();
        for entry in t.iter().map_err(|e| StorageError::Io(e.to_string()))? {
            let (key, _) = entry.map_err(|e| StorageError::Io(e.to_string()))?;
            // Keys are only ever written from valid room ids.
            if let Ok(room) = RoomId::new(key.value()) {
                rooms.push(room);
            }
        }

        Ok(rooms)
    }
}
