//! Session registry for room membership tracking.
//!
//! The registry maintains bidirectional mappings: room → sessions (for
//! broadcast) and session → room (for cleanup on disconnect). A session is
//! in at most one room at a time; joining another room leaves the previous
//! one.

use std::collections::{BTreeSet, HashMap};

use easel_core::RoomId;

/// Registry of connected sessions and the room each one has joined.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    /// Session ID → joined room, `None` until the first join
    sessions: HashMap<u64, Option<RoomId>>,
    /// Room ID → member session IDs, ordered for deterministic fan-out
    rooms: HashMap<RoomId, BTreeSet<u64>>,
}

impl SessionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session. Returns `false` if it already exists.
    pub fn register(&mut self, session_id: u64) -> bool {
        if self.sessions.contains_key(&session_id) {
            return false;
        }
        self.sessions.insert(session_id, None);
        true
    }

    /// Unregister a session, leaving its room.
    ///
    /// Returns the room it was in, if any. `None` also for unknown sessions.
    pub fn unregister(&mut self, session_id: u64) -> Option<RoomId> {
        let room_id = self.sessions.remove(&session_id)??;
        self.remove_member(&room_id, session_id);
        Some(room_id)
    }

    /// Check if a session is registered.
    pub fn has_session(&self, session_id: u64) -> bool {
        self.sessions.contains_key(&session_id)
    }

    /// Move a session into `room_id`.
    ///
    /// Returns the room it left, if it was in a different one. Returns
    /// `Err(())` for an unregistered session.
    #[allow(clippy::result_unit_err, reason = "Only failure mode is an unknown session")]
    pub fn join(&mut self, session_id: u64, room_id: RoomId) -> Result<Option<RoomId>, ()> {
        let current = self.sessions.get_mut(&session_id).ok_or(())?;
        let previous = current.replace(room_id.clone()).filter(|prev| *prev != room_id);

        if let Some(prev) = &previous {
            self.remove_member(prev, session_id);
        }
        self.rooms.entry(room_id).or_default().insert(session_id);
        Ok(previous)
    }

    /// Room a session has joined.
    pub fn room_of(&self, session_id: u64) -> Option<&RoomId> {
        self.sessions.get(&session_id)?.as_ref()
    }

    /// Sessions in a room, in ascending ID order.
    pub fn sessions_in_room(&self, room_id: &RoomId) -> impl Iterator<Item = u64> + '_ {
        self.rooms.get(room_id).into_iter().flat_map(|members| members.iter().copied())
    }

    /// Number of registered sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of sessions in a room.
    pub fn room_session_count(&self, room_id: &RoomId) -> usize {
        self.rooms.get(room_id).map_or(0, BTreeSet::len)
    }

    fn remove_member(&mut self, room_id: &RoomId, session_id: u64) {
        if let Some(members) = self.rooms.get_mut(room_id) {
            members.remove(&session_id);
            if members.is_empty() {
                self.rooms.remove(room_id);
            }
        }
    }
}
