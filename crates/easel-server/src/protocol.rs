//! Line-delimited JSON protocol of the stdio runtime.
//!
//! Inbound, one envelope per line:
//!
//! ```json
//! {"session": 7, "event": {"type": "join", "room": "r1"}}
//! {"session": 7, "event": {"type": "draw", "stroke": {"x0": 0, "y0": 0, "x1": 5, "y1": 5, "color": "#000", "size": 2}}}
//! ```
//!
//! Outbound, one envelope per delivered message:
//!
//! ```json
//! {"to": [7, 9], "message": {"type": "chat", "message": {"user": "ann", "message": "hi", "timestamp": "..."}}}
//! ```
//!
//! Strokes keep their own `type` key, so records always travel nested under
//! a field and never share an object with the message tag.

use easel_core::{ChatMessage, RawRecord, RoomId, Stroke};
use serde::{Deserialize, Serialize};

/// Something a client asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open the session. Optional: the runtime opens sessions on first use.
    Connect,
    /// Join (or switch to) a room
    Join {
        /// Room name, validated by the driver
        room: String,
    },
    /// Draw one stroke
    Draw {
        /// Unvalidated stroke
        stroke: RawRecord,
    },
    /// Clear the room's strokes
    Clear,
    /// Send a chat message
    Chat {
        /// Unvalidated chat message
        message: RawRecord,
    },
    /// Close the session
    Disconnect,
}

/// Inbound line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEnvelope {
    /// Session the event belongs to
    pub session: u64,
    /// The event
    pub event: ClientMessage,
}

/// Something the server tells clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full room history, sent to a session right after it joins
    History {
        /// Joined room
        room: RoomId,
        /// Every stroke, oldest first
        strokes: Vec<Stroke>,
        /// Retained chat messages, oldest first
        messages: Vec<ChatMessage>,
    },
    /// A stroke someone else drew
    Draw {
        /// The stored stroke
        stroke: Stroke,
    },
    /// The room's strokes were cleared
    Clear,
    /// A chat message, including the sender's own
    Chat {
        /// The stored message, with its assigned timestamp
        message: ChatMessage,
    },
    /// The session's last request could not be served
    Error {
        /// Human-readable reason
        reason: String,
    },
}

/// Outbound line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEnvelope {
    /// Recipient sessions, ascending
    pub to: Vec<u64>,
    /// The message
    pub message: ServerMessage,
}
