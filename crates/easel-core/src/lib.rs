//! Easel core types.
//!
//! Pure, I/O-free building blocks shared by the room store and its
//! collaborators:
//!
//! - [`RoomId`]: validated room identifier, safe to use as a storage key
//! - [`record`]: the two record shapes ([`Stroke`], [`ChatMessage`]) and the
//!   validators that turn untrusted [`RawRecord`] input into them
//! - [`env`]: the [`Environment`] abstraction over time, so chat timestamps
//!   can be made deterministic in tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod env;
pub mod record;
mod room;

pub use env::Environment;
pub use record::{
    ChatDraft, ChatMessage, Draft, RawRecord, Record, RecordKind, Rejection, Stroke, StrokeDraft,
};
pub use room::{MAX_ROOM_ID_LEN, RoomId, RoomIdError};
