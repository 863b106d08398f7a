//! Fuzz target for the stores under storage failures
//!
//! Runs operation sequences over `ChaoticStorage` with a fuzzer-chosen
//! failure rate. No model comparison: writes may be lost on purpose.
//!
//! # Invariants
//!
//! - No store operation panics on storage errors
//! - Memory stays authoritative: a room's state only changes through
//!   accepted appends and clears, never through a failed load or write
//! - Every dirty room is resident
//! - Chat never exceeds its retention limit

#![no_main]

use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use easel_core::{RoomId, Stroke};
use easel_harness::{Operation, SimEnv, blank_chat, invalid_stroke, room_id};
use easel_server::{Canvas, ChaoticStorage, MemoryStorage, StoreConfig};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct ChaosScenario {
    /// Seed for ChaoticStorage RNG (deterministic failures)
    chaos_seed: u64,
    /// Failure rate 0-9 maps to 0%-90%
    failure_rate_tenth: u8,
    /// Retry failed flushes
    retry: bool,
    operations: Vec<Operation>,
}

fuzz_target!(|scenario: ChaosScenario| {
    let failure_rate = f64::from(scenario.failure_rate_tenth % 10) / 10.0;
    let storage =
        ChaoticStorage::with_seed(MemoryStorage::new(), failure_rate, scenario.chaos_seed);
    let env = SimEnv::new();
    let canvas = Canvas::new(
        storage,
        env.clone(),
        StoreConfig::strokes().with_retry_failed_flushes(scenario.retry),
        StoreConfig::chat().with_retry_failed_flushes(scenario.retry),
    );
    let chat_limit = StoreConfig::chat().retention.limit().unwrap_or(usize::MAX);

    // Stroke state tracked independently of storage. Rooms first touched
    // while storage fails load empty, so this map starts from the first
    // observed state of each room.
    let mut expected: BTreeMap<RoomId, Vec<Stroke>> = BTreeMap::new();

    for op in scenario.operations.iter().take(256) {
        match *op {
            Operation::Draw { room, stroke } => {
                let room = room_id(room);
                let entry =
                    expected.entry(room.clone()).or_insert_with(|| canvas.strokes().get_state(&room));
                if let Ok(stored) = canvas.strokes().add_record(&room, &stroke.to_raw()) {
                    entry.push(stored);
                }
            },
            Operation::DrawInvalid { room, missing } => {
                let result =
                    canvas.strokes().add_record(&room_id(room), &invalid_stroke(room, missing));
                assert!(result.is_err());
            },
            Operation::Chat { room, message } => {
                let _ = canvas.chat().add_record(&room_id(room), &message.to_raw());
            },
            Operation::ChatBlank { room } => {
                assert!(canvas.chat().add_record(&room_id(room), &blank_chat()).is_err());
            },
            Operation::Clear { room } => {
                let room = room_id(room);
                canvas.strokes().clear(&room);
                expected.insert(room, Vec::new());
            },
            Operation::GetState { room } => {
                let room = room_id(room);
                let state = canvas.strokes().get_state(&room);
                if let Some(expected) = expected.get(&room) {
                    assert_eq!(expected, &state);
                }
                assert!(canvas.chat().get_state(&room).len() <= chat_limit);
            },
            Operation::Flush { room } => {
                let _ = canvas.flush_room(&room_id(room));
            },
            Operation::FlushDirty => {
                canvas.strokes().flush_dirty();
                canvas.chat().flush_dirty();
            },
            // A restart would legitimately lose state; stay in one process.
            Operation::Restart => {},
            Operation::AdvanceTime { millis } => {
                env.advance(std::time::Duration::from_millis(u64::from(millis)));
            },
        }

        let loaded = canvas.strokes().loaded_rooms();
        for room in canvas.strokes().dirty_rooms() {
            assert!(loaded.contains(&room));
        }
    }
});
