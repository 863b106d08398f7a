//! End-to-end tests of the stdio runtime over in-memory streams.

use std::{future, time::Duration};

use easel_core::{RecordKind, RoomId};
use easel_server::{
    Canvas, MemoryStorage, ServerError, StoreConfig, StoreError, SystemEnv,
    protocol::{ServerEnvelope, ServerMessage},
    runtime,
};
use tokio::io::BufReader;

async fn run_script(storage: MemoryStorage, script: &str) -> Vec<ServerEnvelope> {
    let canvas = Canvas::with_defaults(storage, SystemEnv::new());
    let mut output = Vec::new();

    let report =
        runtime::run(canvas, BufReader::new(script.as_bytes()), &mut output, future::pending())
            .await
            .unwrap();
    assert!(report.is_clean());

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_session_script_produces_expected_envelopes() {
    let script = r##"
{"session": 1, "event": {"type": "join", "room": "studio"}}
{"session": 2, "event": {"type": "join", "room": "studio"}}
{"session": 1, "event": {"type": "draw", "stroke": {"x0": 0, "y0": 0, "x1": 9, "y1": 9, "color": "#000", "size": 3, "type": "erase"}}}
{"session": 2, "event": {"type": "clear"}}
"##;

    let out = run_script(MemoryStorage::new(), script).await;

    assert_eq!(out.len(), 4);
    assert_eq!(out[0].to, vec![1]);
    assert!(matches!(out[0].message, ServerMessage::History { .. }));
    assert_eq!(out[1].to, vec![2]);

    let ServerMessage::Draw { stroke } = &out[2].message else {
        panic!("expected draw, got {:?}", out[2].message);
    };
    assert_eq!(out[2].to, vec![2]);
    assert_eq!(stroke.kind(), "erase");

    assert_eq!(out[3], ServerEnvelope { to: vec![1, 2], message: ServerMessage::Clear });
}

#[tokio::test]
async fn test_malformed_lines_are_skipped() {
    let script = r#"
this is not json
{"session": 1, "event": {"type": "fly"}}

{"session": 1, "event": {"type": "join", "room": "ok"}}
"#;

    let out = run_script(MemoryStorage::new(), script).await;

    assert_eq!(out.len(), 1);
    assert!(matches!(out[0].message, ServerMessage::History { .. }));
}

#[tokio::test]
async fn test_bad_room_name_answered_with_error() {
    let script = r#"{"session": 3, "event": {"type": "join", "room": "../../etc/passwd"}}"#;

    let out = run_script(MemoryStorage::new(), script).await;

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].to, vec![3]);
    assert!(matches!(out[0].message, ServerMessage::Error { .. }));
}

#[tokio::test]
async fn test_pending_mutations_flushed_at_eof() {
    let storage = MemoryStorage::new();
    let script = r#"
{"session": 1, "event": {"type": "connect"}}
{"session": 1, "event": {"type": "join", "room": "kept"}}
{"session": 1, "event": {"type": "chat", "message": {"user": "ann", "message": "bye"}}}
{"session": 1, "event": {"type": "disconnect"}}
"#;

    let out = run_script(storage.clone(), script).await;

    let ServerMessage::Chat { message } = &out[1].message else {
        panic!("expected chat, got {:?}", out[1].message);
    };
    assert_eq!(out[1].to, vec![1]);
    assert_eq!(message.message(), "bye");
    assert!(storage.raw(RecordKind::Chat, &RoomId::new("kept").unwrap()).is_some());
}

#[tokio::test]
async fn test_non_utf8_line_does_not_end_the_session() {
    let storage = MemoryStorage::new();
    let mut script = Vec::new();
    script.extend_from_slice(br#"{"session": 1, "event": {"type": "join", "room": "bytes"}}"#);
    script.extend_from_slice(b"\n\xff\xfe garbage\n");
    script.extend_from_slice(
        br#"{"session": 1, "event": {"type": "chat", "message": {"user": "ann", "message": "still here"}}}"#,
    );
    script.push(b'\n');

    let canvas = Canvas::with_defaults(storage.clone(), SystemEnv::new());
    let mut output = Vec::new();
    runtime::run(canvas, BufReader::new(script.as_slice()), &mut output, future::pending())
        .await
        .unwrap();

    let out: Vec<ServerEnvelope> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(out.len(), 2);
    assert!(matches!(&out[1].message, ServerMessage::Chat { message } if message.message() == "still here"));
    assert!(storage.raw(RecordKind::Chat, &RoomId::new("bytes").unwrap()).is_some());
}

#[tokio::test]
async fn test_failed_start_stops_running_flusher() {
    let canvas = Canvas::new(
        MemoryStorage::new(),
        SystemEnv::new(),
        StoreConfig::strokes(),
        StoreConfig::chat().with_flush_interval(Duration::ZERO),
    );
    let handle = canvas.clone();

    let result =
        runtime::run(canvas, BufReader::new(&b""[..]), Vec::new(), future::pending()).await;

    assert!(matches!(result, Err(ServerError::Store(StoreError::ZeroInterval))));
    assert!(!handle.strokes().is_running());
    assert!(!handle.chat().is_running());
}
