//! Fuzz target for record and room id validation
//!
//! Feeds arbitrary JSON text through the same path the runtime uses for
//! inbound strokes and chat messages.
//!
//! # Invariants
//!
//! - Validation NEVER panics, whatever the input
//! - `Draft::is_valid` agrees with `Record::validate`
//! - An accepted record, serialized and read back, validates again
//! - A chat message is never accepted with an empty user or blank body
//! - An accepted room id only uses `[A-Za-z0-9_-]`

#![no_main]

use arbitrary::Arbitrary;
use easel_core::{ChatMessage, Draft, RawRecord, Record, RoomId, Stroke};
use easel_harness::SimEnv;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    record: &'a str,
    room: &'a str,
}

fuzz_target!(|input: Input<'_>| {
    check_room_id(input.room);

    let Ok(value) = serde_json::from_str::<serde_json::Value>(input.record) else {
        return;
    };
    let Ok(raw) = RawRecord::from_value(value) else {
        return;
    };

    let env = SimEnv::new();
    check_record::<Stroke>(&raw, &env);
    if let Some(message) = check_record::<ChatMessage>(&raw, &env) {
        assert!(!message.user().is_empty());
        assert!(!message.message().trim().is_empty());
        assert!(!message.timestamp().is_empty());
    }
});

fn check_record<R: Record>(raw: &RawRecord, env: &SimEnv) -> Option<R> {
    let expect_valid = R::Draft::from_raw(raw).is_valid();
    let result = R::validate(raw, env);
    assert_eq!(expect_valid, result.is_ok(), "draft and validate disagree on {raw:?}");

    let record = result.ok()?;
    let json = serde_json::to_value(&record).expect("records serialize");
    let again = RawRecord::from_value(json).expect("records serialize as objects");
    assert!(R::validate(&again, env).is_ok(), "stored record no longer validates: {record:?}");
    Some(record)
}

fn check_room_id(room: &str) {
    if let Ok(id) = RoomId::new(room) {
        assert_eq!(id.as_str(), room);
        assert!(room.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
    }
}
