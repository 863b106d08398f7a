//! Canvas records and their validators.
//!
//! Clients send loosely shaped JSON objects. Before anything touches room
//! state the object is turned into a typed record in two steps:
//!
//! 1. [`Draft::from_raw`] reads every field the record cares about, noting
//!    what is missing or mistyped. Unknown fields are ignored.
//! 2. [`Draft::finish`] checks the draft (see [`Draft::is_valid`]) and builds
//!    the immutable record, filling defaults such as a chat timestamp.
//!
//! [`Record::validate`] chains both steps and is total: every input maps to
//! either a record or a [`Rejection`], never a panic.

mod chat;
mod stroke;

use std::fmt;

pub use chat::{ChatDraft, ChatMessage};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Number, Value};
pub use stroke::{DEFAULT_STROKE_KIND, Stroke, StrokeDraft};
use thiserror::Error;

use crate::env::Environment;

/// Which per-room history a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Drawing strokes
    Stroke,
    /// Chat messages
    Chat,
}

impl RecordKind {
    /// Both kinds, in a stable order.
    pub const ALL: [Self; 2] = [Self::Stroke, Self::Chat];

    /// Storage name of the kind. Used as file suffix and table name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stroke => "board",
            Self::Chat => "chat",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an untrusted input was not turned into a record.
///
/// Rejections are ordinary values: the caller drops the event and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Input was not a JSON object
    #[error("record must be a JSON object")]
    NotAnObject,

    /// Required field absent or null
    #[error("missing required field `{0}`")]
    Missing(&'static str),

    /// Field present with the wrong JSON type
    #[error("field `{field}` must be {expected}")]
    WrongType {
        /// Offending field
        field: &'static str,
        /// Expected JSON type
        expected: &'static str,
    },

    /// String field present but empty (or whitespace-only where that matters)
    #[error("field `{0}` is empty")]
    Empty(&'static str),
}

/// Untrusted, possibly partial record as received from a client.
///
/// A string-keyed JSON object. Null values are treated exactly like absent
/// keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    /// Empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an arbitrary JSON value. Only objects are accepted.
    pub fn from_value(value: Value) -> Result<Self, Rejection> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(Rejection::NotAnObject),
        }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Field value, with null folded into `None`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Number of keys, including null-valued ones.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no keys at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Required numeric field, kept exactly as sent.
    pub fn number(&self, field: &'static str) -> Result<Number, Rejection> {
        match self.get(field) {
            None => Err(Rejection::Missing(field)),
            Some(Value::Number(n)) => Ok(n.clone()),
            Some(_) => Err(Rejection::WrongType { field, expected: "a number" }),
        }
    }

    /// Required string field. Empty strings are allowed here.
    pub fn string(&self, field: &'static str) -> Result<&str, Rejection> {
        match self.get(field) {
            None => Err(Rejection::Missing(field)),
            Some(v) => v.as_str().ok_or(Rejection::WrongType { field, expected: "a string" }),
        }
    }

    /// Optional string field. Non-string values count as absent.
    pub fn optional_string(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A record shape stored per room.
pub trait Record:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Which history this record lives in.
    const KIND: RecordKind;

    /// Unvalidated intermediate form.
    type Draft: Draft<Record = Self>;

    /// Validate untrusted input into a record.
    fn validate<E: Environment>(raw: &RawRecord, env: &E) -> Result<Self, Rejection> {
        Self::Draft::from_raw(raw).finish(env)
    }
}

/// Unvalidated record read from a [`RawRecord`].
pub trait Draft: Sized {
    /// The record produced by a valid draft.
    type Record;

    /// Read the fields this record cares about. Never fails.
    fn from_raw(raw: &RawRecord) -> Self;

    /// First problem with the draft, if any.
    fn check(&self) -> Result<(), Rejection>;

    /// Whether [`Draft::finish`] would succeed.
    fn is_valid(&self) -> bool {
        self.check().is_ok()
    }

    /// Build the record, assigning defaults from `env` where needed.
    fn finish<E: Environment>(self, env: &E) -> Result<Self::Record, Rejection>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn null_is_absent() {
        let raw = RawRecord::new().with("x0", Value::Null);
        assert!(raw.get("x0").is_none());
        assert_eq!(raw.number("x0"), Err(Rejection::Missing("x0")));
        assert_eq!(raw.len(), 1);
    }

    #[test]
    fn from_value_requires_object() {
        assert_eq!(RawRecord::from_value(json!([1, 2])), Err(Rejection::NotAnObject));
        assert_eq!(RawRecord::from_value(json!("x")), Err(Rejection::NotAnObject));
        assert!(RawRecord::from_value(json!({})).unwrap().is_empty());
    }

    #[test]
    fn typed_accessors() {
        let raw = RawRecord::new().with("n", 3).with("s", "hi").with("b", true);

        assert_eq!(raw.number("n"), Ok(Number::from(3)));
        assert_eq!(raw.string("s"), Ok("hi"));
        assert_eq!(raw.number("s"), Err(Rejection::WrongType { field: "s", expected: "a number" }));
        assert_eq!(raw.string("b"), Err(Rejection::WrongType { field: "b", expected: "a string" }));
        assert_eq!(raw.optional_string("b"), None);
        assert_eq!(raw.optional_string("s"), Some("hi"));
    }

    #[test]
    fn kind_storage_names() {
        assert_eq!(RecordKind::Stroke.as_str(), "board");
        assert_eq!(RecordKind::Chat.as_str(), "chat");
    }
}
