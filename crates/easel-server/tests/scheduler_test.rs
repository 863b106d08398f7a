//! Background flusher tests.
//!
//! These run on a real Tokio runtime with short intervals: the flusher is
//! started, mutations are made, and storage is checked after the interval
//! has elapsed or after `stop()`.

use std::time::Duration;

use easel_core::{RawRecord, RecordKind, RoomId, Stroke};
use easel_server::{
    Canvas, ChaoticStorage, MemoryStorage, RoomStore, Storage, StoreConfig, StrokeStore, SystemEnv,
};
use tempfile::tempdir;

const INTERVAL: Duration = Duration::from_millis(20);

fn room(id: &str) -> RoomId {
    RoomId::new(id).unwrap()
}

fn stroke_raw(i: u32) -> RawRecord {
    RawRecord::new()
        .with("x0", i)
        .with("y0", i)
        .with("x1", i)
        .with("y1", i)
        .with("color", "black")
        .with("size", 1)
}

fn fast_store<S: Storage>(storage: S) -> StrokeStore<S> {
    RoomStore::new(storage, SystemEnv::new(), StoreConfig::strokes().with_flush_interval(INTERVAL))
}

/// Poll until `check` passes or a generous deadline expires.
async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(INTERVAL).await;
    }
    check()
}

#[tokio::test]
async fn test_dirty_rooms_flushed_on_interval() {
    let storage = MemoryStorage::new();
    let store = fast_store(storage.clone());
    store.start().unwrap();

    store.add_record(&room("tick"), &stroke_raw(1)).unwrap();

    assert!(eventually(|| storage.raw(RecordKind::Stroke, &room("tick")).is_some()).await);
    assert!(eventually(|| !store.is_dirty(&room("tick"))).await);

    store.stop().await;
}

#[tokio::test]
async fn test_later_mutations_flushed_on_later_cycles() {
    let storage = MemoryStorage::new();
    let store = fast_store(storage.clone());
    store.start().unwrap();

    for i in 0..5 {
        store.add_record(&room("stream"), &stroke_raw(i)).unwrap();
        tokio::time::sleep(INTERVAL / 2).await;
    }

    let persisted_len = || {
        storage.read_room::<Stroke>(&room("stream")).ok().flatten().map_or(0, |v| v.len())
    };
    assert!(eventually(|| persisted_len() == 5).await);

    store.stop().await;
}

#[tokio::test]
async fn test_stop_drains_pending_mutations() {
    let storage = MemoryStorage::new();
    let store: StrokeStore<_> = RoomStore::new(
        storage.clone(),
        SystemEnv::new(),
        StoreConfig::strokes().with_flush_interval(Duration::from_secs(3600)),
    );
    store.start().unwrap();

    store.add_record(&room("late"), &stroke_raw(1)).unwrap();
    assert!(storage.raw(RecordKind::Stroke, &room("late")).is_none());

    let report = store.stop().await;
    assert_eq!(report.persisted, 1);
    assert!(report.is_clean());
    assert!(storage.raw(RecordKind::Stroke, &room("late")).is_some());
    assert!(!store.is_running());
}

#[tokio::test]
async fn test_flusher_survives_storage_failures() {
    let storage = ChaoticStorage::with_seed(MemoryStorage::new(), 0.5, 42);
    let config = StoreConfig::strokes().with_flush_interval(INTERVAL).with_retry_failed_flushes(true);
    let store: StrokeStore<_> = RoomStore::new(storage.clone(), SystemEnv::new(), config);
    store.start().unwrap();

    for i in 0..4 {
        store.add_record(&room(&format!("r{i}")), &stroke_raw(i)).unwrap();
    }

    assert!(eventually(|| store.dirty_rooms().is_empty()).await);
    assert!(store.is_running());
    for i in 0..4 {
        let persisted: Option<Vec<Stroke>> = storage.inner().read_room(&room(&format!("r{i}"))).unwrap();
        assert_eq!(persisted.map(|v| v.len()), Some(1));
    }

    store.stop().await;
}

#[tokio::test]
async fn test_flusher_ends_when_store_dropped() {
    let storage = MemoryStorage::new();
    let store = fast_store(storage.clone());
    store.start().unwrap();
    store.add_record(&room("gone"), &stroke_raw(1)).unwrap();
    drop(store);

    // Nothing to assert beyond not hanging or panicking: the task only
    // holds a weak reference.
    tokio::time::sleep(INTERVAL * 3).await;
}

#[tokio::test]
async fn test_canvas_round_trip_through_scheduler() {
    let dir = tempdir().unwrap();
    let r = room("sched");

    {
        let storage = easel_server::FileStorage::open(dir.path()).unwrap();
        let canvas = Canvas::new(
            storage,
            SystemEnv::new(),
            StoreConfig::strokes().with_flush_interval(INTERVAL),
            StoreConfig::chat().with_flush_interval(INTERVAL),
        );
        canvas.start().unwrap();
        canvas.strokes().add_record(&r, &stroke_raw(7)).unwrap();
        canvas
            .chat()
            .add_record(&r, &RawRecord::new().with("user", "u").with("message", "m"))
            .unwrap();

        assert!(eventually(|| dir.path().join("sched_chat.json").exists()).await);
        assert!(eventually(|| dir.path().join("sched_board.json").exists()).await);
        canvas.stop().await;
    }

    let canvas =
        Canvas::with_defaults(easel_server::FileStorage::open(dir.path()).unwrap(), SystemEnv::new());
    assert_eq!(canvas.strokes().get_state(&r).len(), 1);
    assert_eq!(canvas.chat().get_state(&r).len(), 1);
}
