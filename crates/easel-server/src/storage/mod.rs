//! Storage abstraction for room histories.
//!
//! Each room has one document per record kind (strokes, chat), replaced
//! wholesale on every write. There is no append log and no partial update:
//! the store always hands storage a complete snapshot of the room.
//!
//! The trait is synchronous. The store calls it from request handlers (lazy
//! load, manual flush) and from the background flusher, which runs it on
//! Tokio's blocking pool.

mod chaotic;
mod codec;
mod error;
mod file;
mod memory;
mod redb;

pub use chaotic::ChaoticStorage;
pub use codec::Codec;
use easel_core::{Record, RecordKind, RoomId};
pub use error::StorageError;
pub use file::FileStorage;
pub use memory::MemoryStorage;

pub use self::redb::RedbStorage;

/// Durable key-value-by-room storage.
///
/// Must be Clone (the stroke store and chat store share one backend), Send +
/// Sync (used from the flusher task), and synchronous. Implementations share
/// internal state via Arc, so clones access the same underlying storage.
pub trait Storage: Clone + Send + Sync + 'static {
    /// Replace the document for `room_id` with `records`.
    ///
    /// # Invariants
    ///
    /// - Post: a subsequent `read_room` returns exactly `records`, in order
    /// - Post: on error, the previous document is either intact or absent,
    ///   never half-written
    fn write_room<R: Record>(&self, room_id: &RoomId, records: &[R]) -> Result<(), StorageError>;

    /// Read the document for `room_id`.
    ///
    /// Returns `Ok(None)` if the room was never written. A document that
    /// exists but cannot be decoded is an error
    /// ([`StorageError::Serialization`]).
    fn read_room<R: Record>(&self, room_id: &RoomId) -> Result<Option<Vec<R>>, StorageError>;

    /// All rooms with a persisted document of the given kind.
    ///
    /// Order is not guaranteed.
    fn list_rooms(&self, kind: RecordKind) -> Result<Vec<RoomId>, StorageError>;
}
