//! Crash recovery tests for the durable backends.
//!
//! A store writes through a backend, is dropped, and a fresh store over a
//! freshly opened backend must see exactly what was flushed, simulating a
//! server restart.

use easel_core::{ChatMessage, RawRecord, RoomId, Stroke};
use easel_harness::SimEnv;
use easel_server::{Canvas, FileStorage, RedbStorage, Storage, StoreConfig};
use tempfile::tempdir;

fn room(id: &str) -> RoomId {
    RoomId::new(id).unwrap()
}

fn stroke_raw(i: u32) -> RawRecord {
    RawRecord::new()
        .with("x0", i)
        .with("y0", 0)
        .with("x1", i)
        .with("y1", 10)
        .with("color", "blue")
        .with("size", 4)
        .with("type", if i % 2 == 0 { "line" } else { "erase" })
}

fn canvas<S: Storage>(storage: S) -> Canvas<S, SimEnv> {
    Canvas::with_defaults(storage, SimEnv::new())
}

/// Fill two rooms, flush one fully and leave a tail unflushed.
fn write_session<S: Storage>(storage: S) -> (Vec<Stroke>, Vec<ChatMessage>) {
    let canvas = canvas(storage);
    let r1 = room("r1");

    for i in 0..5 {
        canvas.strokes().add_record(&r1, &stroke_raw(i)).unwrap();
    }
    canvas
        .chat()
        .add_record(&r1, &RawRecord::new().with("user", "ann").with("message", "hello"))
        .unwrap();
    canvas.flush_room(&r1).unwrap();

    let expected = (canvas.strokes().get_state(&r1), canvas.chat().get_state(&r1));

    // Never flushed: must not survive.
    canvas.strokes().add_record(&r1, &stroke_raw(99)).unwrap();
    canvas.strokes().add_record(&room("r2"), &stroke_raw(1)).unwrap();

    expected
}

fn assert_recovered<S: Storage>(storage: S, expected: &(Vec<Stroke>, Vec<ChatMessage>)) {
    let canvas = canvas(storage);

    assert_eq!(&canvas.strokes().get_state(&room("r1")), &expected.0);
    assert_eq!(&canvas.chat().get_state(&room("r1")), &expected.1);
    assert!(canvas.strokes().get_state(&room("r2")).is_empty());
}

#[test]
fn test_file_storage_survives_restart() {
    let dir = tempdir().unwrap();

    let expected = write_session(FileStorage::open(dir.path()).unwrap());
    assert_eq!(expected.0.len(), 5);
    assert_eq!(expected.0[1].kind(), "erase");

    assert_recovered(FileStorage::open(dir.path()).unwrap(), &expected);
}

#[test]
fn test_redb_storage_survives_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("canvas.redb");

    let expected = {
        let storage = RedbStorage::open(&db_path).unwrap();
        write_session(storage)
        // Database dropped
    };

    assert_recovered(RedbStorage::open(&db_path).unwrap(), &expected);
}

#[test]
fn test_cleared_room_stays_cleared() {
    let dir = tempdir().unwrap();

    {
        let canvas = canvas(FileStorage::open(dir.path()).unwrap());
        canvas.strokes().add_record(&room("wipe"), &stroke_raw(1)).unwrap();
        canvas.strokes().flush(&room("wipe")).unwrap();
        canvas.strokes().clear(&room("wipe"));
    }

    let canvas = canvas(FileStorage::open(dir.path()).unwrap());
    assert!(canvas.strokes().get_state(&room("wipe")).is_empty());
}

#[test]
fn test_reads_legacy_data_files() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("legacy_board.json"),
        r##"[{"x0": 1, "y0": 2, "x1": 3, "y1": 4, "color": "#fff", "size": 5, "type": "line"}]"##,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("legacy_chat.json"),
        r#"[{"user": "ann", "message": "hi", "timestamp": "2024-01-01T00:00:00.000000"}]"#,
    )
    .unwrap();

    let canvas = canvas(FileStorage::open(dir.path()).unwrap());
    let strokes = canvas.strokes().get_state(&room("legacy"));
    let chat = canvas.chat().get_state(&room("legacy"));

    assert_eq!(strokes.len(), 1);
    assert_eq!(strokes[0].end(), (3.0, 4.0));
    assert_eq!(chat[0].timestamp(), "2024-01-01T00:00:00.000000");
}

#[test]
fn test_chat_limit_applies_after_reload() {
    let dir = tempdir().unwrap();
    let config = StoreConfig::chat();

    {
        let canvas = canvas(FileStorage::open(dir.path()).unwrap());
        for i in 0..60 {
            canvas
                .chat()
                .add_record(&room("busy"), &RawRecord::new().with("user", "u").with("message", format!("{i}")))
                .unwrap();
        }
        assert_eq!(canvas.chat().flush_dirty().persisted, 1);
    }

    let canvas = canvas(FileStorage::open(dir.path()).unwrap());
    let chat = canvas.chat().get_state(&room("busy"));
    assert_eq!(Some(chat.len()), config.retention.limit());
    assert_eq!(chat[0].message(), "10");
}
