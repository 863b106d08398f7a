//! Operations for model-based testing.
//!
//! Operations are generated randomly (by proptest or from fuzzer bytes) and
//! applied to both the model and the real stores.

use arbitrary::Arbitrary;
use easel_core::{ChatMessage, RawRecord, Stroke};

/// Room identifier (folded onto a handful of real rooms).
pub type ModelRoomId = u8;

/// Operations that can be applied to a canvas.
#[derive(Debug, Clone, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// Append a valid stroke.
    Draw {
        /// Target room.
        room: ModelRoomId,
        /// Stroke content.
        stroke: SmallStroke,
    },

    /// Append a stroke with one required field missing.
    DrawInvalid {
        /// Target room.
        room: ModelRoomId,
        /// Which field to drop (mod 6).
        missing: u8,
    },

    /// Append a valid chat message.
    Chat {
        /// Target room.
        room: ModelRoomId,
        /// Message content.
        message: SmallChat,
    },

    /// Append a chat message whose body is only whitespace.
    ChatBlank {
        /// Target room.
        room: ModelRoomId,
    },

    /// Clear a room's strokes.
    Clear {
        /// Target room.
        room: ModelRoomId,
    },

    /// Read a room's strokes and chat.
    GetState {
        /// Target room.
        room: ModelRoomId,
    },

    /// Persist one room in both stores.
    Flush {
        /// Target room.
        room: ModelRoomId,
    },

    /// Run one background flush cycle in both stores.
    FlushDirty,

    /// Drop the stores without flushing and reopen them on the same storage.
    Restart,

    /// Advance virtual time (changes assigned chat timestamps).
    AdvanceTime {
        /// Milliseconds to advance.
        millis: u16,
    },
}

/// Compact stroke for testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub struct SmallStroke {
    /// Start x; end is offset by `len`.
    pub x: u8,
    /// Start y.
    pub y: u8,
    /// Segment length.
    pub len: u8,
    /// Palette index (mod 4).
    pub color: u8,
}

const PALETTE: [&str; 4] = ["#000000", "#ff0000", "#00ff00", "eraser"];
const STROKE_FIELDS: [&str; 6] = ["x0", "y0", "x1", "y1", "color", "size"];

impl SmallStroke {
    /// Expand into an untrusted record.
    pub fn to_raw(self) -> RawRecord {
        RawRecord::new()
            .with("x0", self.x)
            .with("y0", self.y)
            .with("x1", u16::from(self.x) + u16::from(self.len))
            .with("y1", self.y)
            .with("color", PALETTE[usize::from(self.color) % PALETTE.len()])
            .with("size", 1 + self.len % 8)
    }

    /// Expand with one required field removed.
    pub fn to_raw_missing(self, missing: u8) -> RawRecord {
        let field = STROKE_FIELDS[usize::from(missing) % STROKE_FIELDS.len()];
        let mut raw = RawRecord::new();
        for (key, value) in [
            ("x0", self.x),
            ("y0", self.y),
            ("x1", self.x.wrapping_add(self.len)),
            ("y1", self.y),
            ("size", 1),
        ] {
            if key != field {
                raw.insert(key, value);
            }
        }
        if field != "color" {
            raw.insert("color", "#000000");
        }
        raw
    }
}

/// Compact chat message for testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub struct SmallChat {
    /// User index (mod 3).
    pub user: u8,
    /// Message seed.
    pub seed: u16,
    /// Whether the client supplies its own timestamp.
    pub with_timestamp: bool,
}

const USERS: [&str; 3] = ["ann", "bo", "cy"];

impl SmallChat {
    /// Expand into an untrusted record.
    pub fn to_raw(self) -> RawRecord {
        let raw = RawRecord::new()
            .with("user", USERS[usize::from(self.user) % USERS.len()])
            .with("message", format!("msg {}", self.seed));
        if self.with_timestamp {
            raw.with("timestamp", format!("client-{}", self.seed))
        } else {
            raw
        }
    }
}

/// What an operation revealed. Compared between model and real system.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// Record accepted.
    Accepted,
    /// Record rejected.
    Rejected,
    /// Room contents.
    State {
        /// Strokes, oldest first.
        strokes: Vec<Stroke>,
        /// Chat messages, oldest first.
        chat: Vec<ChatMessage>,
    },
    /// Operation with nothing to observe.
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_is_absent() {
        let stroke = SmallStroke { x: 1, y: 2, len: 3, color: 0 };
        for (i, field) in STROKE_FIELDS.iter().enumerate() {
            let raw = stroke.to_raw_missing(i as u8);
            assert!(raw.get(field).is_none(), "{field}");
            assert_eq!(raw.len(), STROKE_FIELDS.len() - 1);
        }
    }

    #[test]
    fn chat_timestamp_is_optional() {
        let chat = SmallChat { user: 4, seed: 9, with_timestamp: false };
        assert!(chat.to_raw().get("timestamp").is_none());
        assert_eq!(chat.to_raw().optional_string("user"), Some("bo"));

        let chat = SmallChat { with_timestamp: true, ..chat };
        assert_eq!(chat.to_raw().optional_string("timestamp"), Some("client-9"));
    }
}
