//! Reference model of the canvas stores.
//!
//! The model keeps the same three pieces of state as a real store (resident
//! rooms, dirty set, persisted documents) in the plainest possible form and
//! applies every operation synchronously. Storage never fails in the model,
//! so it is compared against real stores running over a reliable backend.

mod operation;

use std::collections::{BTreeMap, BTreeSet};

use easel_core::{ChatMessage, Environment, RawRecord, Record, RoomId, Stroke};
pub use operation::{ModelRoomId, Observation, Operation, SmallChat, SmallStroke};

/// Chat history limit used on both sides of model-based tests. Small, so
/// trimming happens often.
pub const MODEL_CHAT_HISTORY: usize = 3;

/// Number of distinct real rooms model room ids fold onto.
const ROOM_COUNT: u8 = 4;

const ROOM_NAMES: [&str; ROOM_COUNT as usize] = ["room-0", "room-1", "room-2", "room-3"];

/// Real room for a model room id.
pub fn room_id(room: ModelRoomId) -> RoomId {
    let name = ROOM_NAMES[usize::from(room % ROOM_COUNT)];
    #[allow(clippy::expect_used)]
    RoomId::new(name).expect("invariant: fixed room names use the room id alphabet")
}

/// One store's worth of reference state.
#[derive(Debug, Clone)]
pub struct ModelStore<R> {
    resident: BTreeMap<RoomId, Vec<R>>,
    dirty: BTreeSet<RoomId>,
    persisted: BTreeMap<RoomId, Vec<R>>,
    limit: Option<usize>,
}

impl<R: Record> ModelStore<R> {
    /// Empty model. `limit` bounds room length after each append.
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            resident: BTreeMap::new(),
            dirty: BTreeSet::new(),
            persisted: BTreeMap::new(),
            limit,
        }
    }

    fn load(&mut self, room: &RoomId) -> &mut Vec<R> {
        let persisted = &self.persisted;
        self.resident
            .entry(room.clone())
            .or_insert_with(|| persisted.get(room).cloned().unwrap_or_default())
    }

    /// Room contents, loading on first touch.
    pub fn get_state(&mut self, room: &RoomId) -> Vec<R> {
        self.load(room).clone()
    }

    /// Validate and append. Returns whether the record was accepted.
    pub fn add<E: Environment>(&mut self, room: &RoomId, raw: &RawRecord, env: &E) -> bool {
        let limit = self.limit;
        let records = self.load(room);
        let Ok(record) = R::validate(raw, env) else { return false };

        records.push(record);
        if let Some(limit) = limit {
            let excess = records.len().saturating_sub(limit);
            records.drain(..excess);
        }
        self.dirty.insert(room.clone());
        true
    }

    /// Empty a room and persist it.
    pub fn clear(&mut self, room: &RoomId) {
        self.resident.insert(room.clone(), Vec::new());
        self.persisted.insert(room.clone(), Vec::new());
        self.dirty.remove(room);
    }

    /// Persist one room if resident.
    pub fn flush(&mut self, room: &RoomId) {
        if let Some(records) = self.resident.get(room) {
            self.persisted.insert(room.clone(), records.clone());
            self.dirty.remove(room);
        }
    }

    /// Persist every dirty room. Returns how many were written.
    pub fn flush_dirty(&mut self) -> usize {
        let dirty = std::mem::take(&mut self.dirty);
        for room in &dirty {
            if let Some(records) = self.resident.get(room) {
                self.persisted.insert(room.clone(), records.clone());
            }
        }
        dirty.len()
    }

    /// Forget everything not persisted.
    pub fn restart(&mut self) {
        self.resident.clear();
        self.dirty.clear();
    }

    /// Persisted document for a room, if any was written.
    pub fn persisted(&self, room: &RoomId) -> Option<&Vec<R>> {
        self.persisted.get(room)
    }

    /// Rooms with unpersisted mutations, sorted.
    pub fn dirty_rooms(&self) -> Vec<RoomId> {
        self.dirty.iter().cloned().collect()
    }

    /// Resident rooms, sorted.
    pub fn loaded_rooms(&self) -> Vec<RoomId> {
        self.resident.keys().cloned().collect()
    }
}

/// Reference model of a stroke store and a chat store side by side.
#[derive(Debug, Clone)]
pub struct ModelCanvas<E> {
    /// Stroke store model
    pub strokes: ModelStore<Stroke>,
    /// Chat store model, bounded by [`MODEL_CHAT_HISTORY`]
    pub chat: ModelStore<ChatMessage>,
    env: E,
}

impl<E: Environment> ModelCanvas<E> {
    /// Empty model using `env` for chat timestamps. The real system under
    /// comparison must share the same clock.
    pub fn new(env: E) -> Self {
        Self {
            strokes: ModelStore::new(None),
            chat: ModelStore::new(Some(MODEL_CHAT_HISTORY)),
            env,
        }
    }

    /// Apply an operation. `AdvanceTime` is left to the caller, who owns the
    /// clock.
    pub fn apply(&mut self, op: &Operation) -> Observation {
        match *op {
            Operation::Draw { room, stroke } => {
                accepted(self.strokes.add(&room_id(room), &stroke.to_raw(), &self.env))
            },
            Operation::DrawInvalid { room, missing } => {
                accepted(self.strokes.add(&room_id(room), &invalid_stroke(room, missing), &self.env))
            },
            Operation::Chat { room, message } => {
                accepted(self.chat.add(&room_id(room), &message.to_raw(), &self.env))
            },
            Operation::ChatBlank { room } => {
                accepted(self.chat.add(&room_id(room), &blank_chat(), &self.env))
            },
            Operation::Clear { room } => {
                self.strokes.clear(&room_id(room));
                Observation::Done
            },
            Operation::GetState { room } => {
                let room = room_id(room);
                Observation::State {
                    strokes: self.strokes.get_state(&room),
                    chat: self.chat.get_state(&room),
                }
            },
            Operation::Flush { room } => {
                self.strokes.flush(&room_id(room));
                self.chat.flush(&room_id(room));
                Observation::Done
            },
            Operation::FlushDirty => {
                self.strokes.flush_dirty();
                self.chat.flush_dirty();
                Observation::Done
            },
            Operation::Restart => {
                self.strokes.restart();
                self.chat.restart();
                Observation::Done
            },
            Operation::AdvanceTime { .. } => Observation::Done,
        }
    }
}

/// Raw invalid stroke used for [`Operation::DrawInvalid`].
pub fn invalid_stroke(room: ModelRoomId, missing: u8) -> RawRecord {
    SmallStroke { x: room, y: missing, len: 1, color: 0 }.to_raw_missing(missing)
}

/// Raw chat message with a whitespace-only body.
pub fn blank_chat() -> RawRecord {
    RawRecord::new().with("user", "ann").with("message", " \t ")
}

fn accepted(ok: bool) -> Observation {
    if ok { Observation::Accepted } else { Observation::Rejected }
}
