//! Canvas driver.
//!
//! Ties together the [`Canvas`] stores and the [`SessionRegistry`]. The
//! driver is Sans-IO: the runtime feeds it [`CanvasEvent`]s and executes the
//! [`CanvasAction`]s it returns, so the same logic runs under the stdio
//! runtime and in tests.

use easel_core::{Environment, RawRecord, RoomId};

use crate::{
    Canvas, SystemEnv,
    protocol::ServerMessage,
    registry::SessionRegistry,
    storage::Storage,
};

/// Events that the canvas driver processes.
///
/// These are produced by the external runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    /// A session connected
    SessionOpened {
        /// Unique session ID assigned by the runtime
        session_id: u64,
    },

    /// A session asked to join a room
    Join {
        /// Requesting session
        session_id: u64,
        /// Room name, not yet validated
        room: String,
    },

    /// A session drew a stroke in its room
    Draw {
        /// Drawing session
        session_id: u64,
        /// Unvalidated stroke
        stroke: RawRecord,
    },

    /// A session cleared its room's strokes
    Clear {
        /// Clearing session
        session_id: u64,
    },

    /// A session sent a chat message to its room
    Chat {
        /// Sending session
        session_id: u64,
        /// Unvalidated chat message
        message: RawRecord,
    },

    /// A session disconnected
    SessionClosed {
        /// Session that went away
        session_id: u64,
    },
}

/// Actions that the canvas driver produces.
///
/// These are executed by runtime-specific code.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasAction {
    /// Send a message to a specific session
    SendToSession {
        /// Target session ID
        session_id: u64,
        /// Message to send
        message: ServerMessage,
    },

    /// Broadcast a message to all sessions in a room
    BroadcastToRoom {
        /// Target room ID
        room_id: RoomId,
        /// Message to broadcast
        message: ServerMessage,
        /// Optional session to exclude from broadcast
        exclude_session: Option<u64>,
    },

    /// Log a message (for debugging/monitoring)
    Log {
        /// Log level
        level: LogLevel,
        /// Message to log
        message: String,
    },
}

/// Log levels for driver actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warn,
}

/// Action-based canvas driver.
pub struct CanvasDriver<S: Storage, E: Environment = SystemEnv> {
    canvas: Canvas<S, E>,
    registry: SessionRegistry,
}

impl<S: Storage, E: Environment> CanvasDriver<S, E> {
    /// Create a driver over `canvas`. No sessions are registered.
    pub fn new(canvas: Canvas<S, E>) -> Self {
        Self { canvas, registry: SessionRegistry::new() }
    }

    /// The stores this driver mutates.
    pub fn canvas(&self) -> &Canvas<S, E> {
        &self.canvas
    }

    /// Session membership.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Process an event and return actions to execute.
    pub fn process_event(&mut self, event: CanvasEvent) -> Vec<CanvasAction> {
        match event {
            CanvasEvent::SessionOpened { session_id } => self.handle_session_opened(session_id),
            CanvasEvent::Join { session_id, room } => self.handle_join(session_id, &room),
            CanvasEvent::Draw { session_id, stroke } => self.handle_draw(session_id, &stroke),
            CanvasEvent::Clear { session_id } => self.handle_clear(session_id),
            CanvasEvent::Chat { session_id, message } => self.handle_chat(session_id, &message),
            CanvasEvent::SessionClosed { session_id } => self.handle_session_closed(session_id),
        }
    }

    /// Resolve a broadcast to its recipients, ascending.
    pub fn recipients(&self, room_id: &RoomId, exclude_session: Option<u64>) -> Vec<u64> {
        self.registry
            .sessions_in_room(room_id)
            .filter(|id| Some(*id) != exclude_session)
            .collect()
    }

    fn handle_session_opened(&mut self, session_id: u64) -> Vec<CanvasAction> {
        if !self.registry.register(session_id) {
            return vec![log(LogLevel::Warn, format!("session {session_id} already open"))];
        }
        vec![log(LogLevel::Debug, format!("session {session_id} opened"))]
    }

    fn handle_join(&mut self, session_id: u64, room: &str) -> Vec<CanvasAction> {
        let room_id = match RoomId::new(room) {
            Ok(room_id) => room_id,
            Err(e) => {
                return vec![
                    CanvasAction::SendToSession {
                        session_id,
                        message: ServerMessage::Error { reason: e.to_string() },
                    },
                    log(LogLevel::Debug, format!("session {session_id} bad room: {e}")),
                ];
            },
        };

        let Ok(previous) = self.registry.join(session_id, room_id.clone()) else {
            return vec![unknown_session(session_id, "join")];
        };

        let mut actions = Vec::with_capacity(3);
        if let Some(previous) = previous {
            actions.push(log(LogLevel::Debug, format!("session {session_id} left {previous}")));
        }

        let strokes = self.canvas.strokes().get_state(&room_id);
        let messages = self.canvas.chat().get_state(&room_id);
        actions.push(log(
            LogLevel::Info,
            format!(
                "session {session_id} joined {room_id} ({} strokes, {} messages)",
                strokes.len(),
                messages.len()
            ),
        ));
        actions.push(CanvasAction::SendToSession {
            session_id,
            message: ServerMessage::History { room: room_id, strokes, messages },
        });
        actions
    }

    fn handle_draw(&mut self, session_id: u64, raw: &RawRecord) -> Vec<CanvasAction> {
        let Some(room_id) = self.joined_room(session_id) else {
            return vec![not_joined(session_id, "draw")];
        };

        match self.canvas.strokes().add_record(&room_id, raw) {
            Ok(stroke) => vec![CanvasAction::BroadcastToRoom {
                room_id,
                message: ServerMessage::Draw { stroke },
                exclude_session: Some(session_id),
            }],
            Err(rejection) => vec![log(
                LogLevel::Debug,
                format!("session {session_id} stroke rejected: {rejection}"),
            )],
        }
    }

    fn handle_clear(&mut self, session_id: u64) -> Vec<CanvasAction> {
        let Some(room_id) = self.joined_room(session_id) else {
            return vec![not_joined(session_id, "clear")];
        };

        self.canvas.strokes().clear(&room_id);
        vec![
            log(LogLevel::Info, format!("session {session_id} cleared {room_id}")),
            CanvasAction::BroadcastToRoom {
                room_id,
                message: ServerMessage::Clear,
                exclude_session: None,
            },
        ]
    }

    fn handle_chat(&mut self, session_id: u64, raw: &RawRecord) -> Vec<CanvasAction> {
        let Some(room_id) = self.joined_room(session_id) else {
            return vec![not_joined(session_id, "chat")];
        };

        match self.canvas.chat().add_record(&room_id, raw) {
            Ok(message) => vec![CanvasAction::BroadcastToRoom {
                room_id,
                message: ServerMessage::Chat { message },
                exclude_session: None,
            }],
            Err(rejection) => vec![log(
                LogLevel::Debug,
                format!("session {session_id} chat rejected: {rejection}"),
            )],
        }
    }

    fn handle_session_closed(&mut self, session_id: u64) -> Vec<CanvasAction> {
        if !self.registry.has_session(session_id) {
            return vec![unknown_session(session_id, "close")];
        }
        let message = match self.registry.unregister(session_id) {
            Some(room_id) => format!("session {session_id} closed, left {room_id}"),
            None => format!("session {session_id} closed"),
        };
        vec![log(LogLevel::Debug, message)]
    }

    fn joined_room(&self, session_id: u64) -> Option<RoomId> {
        self.registry.room_of(session_id).cloned()
    }
}

fn log(level: LogLevel, message: String) -> CanvasAction {
    CanvasAction::Log { level, message }
}

fn not_joined(session_id: u64, what: &str) -> CanvasAction {
    log(LogLevel::Debug, format!("session {session_id} sent {what} before joining a room"))
}

fn unknown_session(session_id: u64, what: &str) -> CanvasAction {
    log(LogLevel::Warn, format!("{what} from unknown session {session_id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn driver() -> CanvasDriver<MemoryStorage> {
        CanvasDriver::new(Canvas::with_defaults(MemoryStorage::new(), SystemEnv::new()))
    }

    fn open_and_join(driver: &mut CanvasDriver<MemoryStorage>, session_id: u64, room: &str) {
        driver.process_event(CanvasEvent::SessionOpened { session_id });
        driver.process_event(CanvasEvent::Join { session_id, room: room.to_string() });
    }

    fn sends(actions: &[CanvasAction]) -> Vec<&CanvasAction> {
        actions.iter().filter(|a| !matches!(a, CanvasAction::Log { .. })).collect()
    }

    #[test]
    fn duplicate_open_is_logged() {
        let mut driver = driver();
        driver.process_event(CanvasEvent::SessionOpened { session_id: 1 });
        let actions = driver.process_event(CanvasEvent::SessionOpened { session_id: 1 });

        assert!(matches!(actions.as_slice(), [CanvasAction::Log { level: LogLevel::Warn, .. }]));
    }

    #[test]
    fn bad_room_name_gets_error() {
        let mut driver = driver();
        driver.process_event(CanvasEvent::SessionOpened { session_id: 1 });
        let actions =
            driver.process_event(CanvasEvent::Join { session_id: 1, room: "../etc".to_string() });

        assert!(matches!(sends(&actions).as_slice(), [CanvasAction::SendToSession {
            session_id: 1,
            message: ServerMessage::Error { .. },
        }]));
        assert_eq!(driver.registry().room_of(1), None);
    }

    #[test]
    fn join_sends_empty_history_for_new_room() {
        let mut driver = driver();
        driver.process_event(CanvasEvent::SessionOpened { session_id: 1 });
        let actions =
            driver.process_event(CanvasEvent::Join { session_id: 1, room: "fresh".to_string() });

        let expected = CanvasAction::SendToSession {
            session_id: 1,
            message: ServerMessage::History {
                room: RoomId::new("fresh").unwrap(),
                strokes: vec![],
                messages: vec![],
            },
        };
        assert_eq!(sends(&actions), vec![&expected]);
    }

    #[test]
    fn events_before_join_are_dropped() {
        let mut driver = driver();
        driver.process_event(CanvasEvent::SessionOpened { session_id: 1 });

        let actions = driver.process_event(CanvasEvent::Clear { session_id: 1 });
        assert!(sends(&actions).is_empty());
        assert!(driver.canvas().strokes().loaded_rooms().is_empty());
    }

    #[test]
    fn recipients_respect_exclusion() {
        let mut driver = driver();
        open_and_join(&mut driver, 1, "r");
        open_and_join(&mut driver, 2, "r");
        open_and_join(&mut driver, 3, "other");

        let room = RoomId::new("r").unwrap();
        assert_eq!(driver.recipients(&room, None), vec![1, 2]);
        assert_eq!(driver.recipients(&room, Some(1)), vec![2]);
    }

    #[test]
    fn close_unknown_session_is_logged() {
        let mut driver = driver();
        let actions = driver.process_event(CanvasEvent::SessionClosed { session_id: 42 });
        assert!(matches!(actions.as_slice(), [CanvasAction::Log { level: LogLevel::Warn, .. }]));
    }
}
