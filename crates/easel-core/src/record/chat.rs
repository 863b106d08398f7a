use serde::{Deserialize, Serialize};

use super::{Draft, RawRecord, Record, RecordKind, Rejection};
use crate::env::Environment;

/// One validated chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    user: String,
    message: String,
    timestamp: String,
}

impl ChatMessage {
    /// Display name of the sender.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Message body, untrimmed.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// ISO-8601 timestamp, either client-supplied or assigned on creation.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

impl Record for ChatMessage {
    const KIND: RecordKind = RecordKind::Chat;
    type Draft = ChatDraft;
}

/// Chat fields as read from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatDraft {
    user: Result<String, Rejection>,
    message: Result<String, Rejection>,
    timestamp: Option<String>,
}

impl Draft for ChatDraft {
    type Record = ChatMessage;

    fn from_raw(raw: &RawRecord) -> Self {
        let user = raw.string("user").and_then(|user| {
            if user.is_empty() { Err(Rejection::Empty("user")) } else { Ok(user.to_string()) }
        });

        let message = raw.string("message").and_then(|message| {
            if message.trim().is_empty() {
                Err(Rejection::Empty("message"))
            } else {
                Ok(message.to_string())
            }
        });

        let timestamp =
            raw.optional_string("timestamp").filter(|ts| !ts.is_empty()).map(str::to_string);

        Self { user, message, timestamp }
    }

    fn check(&self) -> Result<(), Rejection> {
        self.user.as_ref().map_err(Clone::clone)?;
        self.message.as_ref().map_err(Clone::clone)?;
        Ok(())
    }

    fn finish<E: Environment>(self, env: &E) -> Result<ChatMessage, Rejection> {
        let user = self.user?;
        let message = self.message?;
        let timestamp = self.timestamp.unwrap_or_else(|| env.timestamp());

        Ok(ChatMessage { user, message, timestamp })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use chrono::{DateTime, Utc};

    use super::*;

    #[derive(Clone)]
    struct FixedClock;

    impl Environment for FixedClock {
        type Instant = Instant;

        #[allow(clippy::disallowed_methods)]
        fn now(&self) -> Instant {
            Instant::now()
        }

        fn wall_clock(&self) -> DateTime<Utc> {
            DateTime::from_timestamp(1_714_564_800, 0).unwrap()
        }
    }

    #[test]
    fn valid_message_gets_timestamp() {
        let raw = RawRecord::new().with("user", "ada").with("message", "hello");
        let msg = ChatMessage::validate(&raw, &FixedClock).unwrap();

        assert_eq!(msg.user(), "ada");
        assert_eq!(msg.message(), "hello");
        assert_eq!(msg.timestamp(), "2024-05-01T12:00:00.000000Z");
    }

    #[test]
    fn supplied_timestamp_kept() {
        let raw = RawRecord::new().with("user", "u").with("message", "m").with("timestamp", "t");
        let msg = ChatMessage::validate(&raw, &FixedClock).unwrap();
        assert_eq!(msg.timestamp(), "t");
    }

    #[test]
    fn empty_or_mistyped_timestamp_is_assigned() {
        for ts in [serde_json::json!(""), serde_json::json!(12), serde_json::Value::Null] {
            let raw = RawRecord::new().with("user", "u").with("message", "m").with("timestamp", ts);
            let msg = ChatMessage::validate(&raw, &FixedClock).unwrap();
            assert_eq!(msg.timestamp(), "2024-05-01T12:00:00.000000Z");
        }
    }

    #[test]
    fn blank_message_rejected() {
        for body in ["", "   ", "\t\n"] {
            let raw = RawRecord::new().with("user", "user").with("message", body);
            let draft = ChatDraft::from_raw(&raw);
            assert!(!draft.is_valid());
            assert_eq!(draft.check(), Err(Rejection::Empty("message")));
        }
    }

    #[test]
    fn message_is_not_trimmed() {
        let raw = RawRecord::new().with("user", "u").with("message", "  hi  ");
        let msg = ChatMessage::validate(&raw, &FixedClock).unwrap();
        assert_eq!(msg.message(), "  hi  ");
    }

    #[test]
    fn user_required() {
        let missing = RawRecord::new().with("message", "hello");
        assert_eq!(ChatMessage::validate(&missing, &FixedClock), Err(Rejection::Missing("user")));

        let empty = RawRecord::new().with("user", "").with("message", "hello");
        assert_eq!(ChatMessage::validate(&empty, &FixedClock), Err(Rejection::Empty("user")));
    }

    #[test]
    fn wire_shape() {
        let raw = RawRecord::new().with("user", "ada").with("message", "hello").with("room", "x");
        let msg = ChatMessage::validate(&raw, &FixedClock).unwrap();

        insta::assert_json_snapshot!(msg, @r#"
        {
          "user": "ada",
          "message": "hello",
          "timestamp": "2024-05-01T12:00:00.000000Z"
        }
        "#);
    }
}
