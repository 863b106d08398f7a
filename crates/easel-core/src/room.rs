//! Room identifiers.
//!
//! Room ids are opaque to the store but they end up in file names and
//! database keys, so construction rejects anything outside a conservative
//! alphabet. UUIDs (hyphenated or simple) always qualify.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length of a room identifier in bytes.
pub const MAX_ROOM_ID_LEN: usize = 128;

/// Errors produced when parsing a room identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomIdError {
    /// Identifier was empty
    #[error("room id is empty")]
    Empty,

    /// Identifier exceeded [`MAX_ROOM_ID_LEN`]
    #[error("room id is {len} bytes, maximum is {MAX_ROOM_ID_LEN}")]
    TooLong {
        /// Actual length in bytes
        len: usize,
    },

    /// Identifier contained a character outside `[A-Za-z0-9_-]`
    #[error("room id contains invalid character {0:?}")]
    InvalidChar(char),
}

/// Identifier of a room.
///
/// A room owns one stroke history and one chat history. There is no explicit
/// creation step: a room exists as soon as any event references its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    /// Parse and validate a room identifier.
    pub fn new(id: impl Into<String>) -> Result<Self, RoomIdError> {
        let id = id.into();

        if id.is_empty() {
            return Err(RoomIdError::Empty);
        }

        if id.len() > MAX_ROOM_ID_LEN {
            return Err(RoomIdError::TooLong { len: id.len() });
        }

        if let Some(c) = id.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(RoomIdError::InvalidChar(c));
        }

        Ok(Self(id))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RoomId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for RoomId {
    type Err = RoomIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RoomId {
    type Error = RoomIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoomId> for String {
    fn from(id: RoomId) -> Self {
        id.0
    }
}
