//! Fuzz target comparing the real stores against the reference model
//!
//! Operation sequences come straight from fuzzer bytes, so the fuzzer can
//! steer into interleavings of flush, clear and restart that proptest
//! rarely generates.
//!
//! # Invariants
//!
//! - Every operation observes the same result on both sides
//! - Dirty and resident room sets match after every operation
//! - Persisted documents match after every operation

#![no_main]

use std::{num::NonZeroUsize, time::Duration};

use easel_core::{ChatMessage, Stroke};
use easel_harness::{
    MODEL_CHAT_HISTORY, ModelCanvas, Observation, Operation, SimEnv, blank_chat, invalid_stroke,
    room_id,
};
use easel_server::{Canvas, MemoryStorage, Retention, Storage, StoreConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|ops: Vec<Operation>| {
    let env = SimEnv::new();
    let storage = MemoryStorage::new();
    let mut model = ModelCanvas::new(env.clone());
    let mut canvas = open(&storage, &env);

    for op in ops.iter().take(256) {
        let real = apply(&mut canvas, &storage, &env, op);
        let expected = model.apply(op);
        assert_eq!(expected, real, "{op:?}");

        assert_eq!(model.strokes.dirty_rooms(), canvas.strokes().dirty_rooms());
        assert_eq!(model.chat.dirty_rooms(), canvas.chat().dirty_rooms());
        assert_eq!(model.strokes.loaded_rooms(), canvas.strokes().loaded_rooms());
        assert_eq!(model.chat.loaded_rooms(), canvas.chat().loaded_rooms());

        for room in (0..4).map(room_id) {
            let strokes: Option<Vec<Stroke>> = storage.read_room(&room).expect("memory storage");
            let chat: Option<Vec<ChatMessage>> = storage.read_room(&room).expect("memory storage");
            assert_eq!(model.strokes.persisted(&room), strokes.as_ref());
            assert_eq!(model.chat.persisted(&room), chat.as_ref());
        }
    }
});

fn open(storage: &MemoryStorage, env: &SimEnv) -> Canvas<MemoryStorage, SimEnv> {
    let limit = NonZeroUsize::new(MODEL_CHAT_HISTORY).expect("non-zero");
    let chat = StoreConfig::chat().with_retention(Retention::KeepLatest(limit));
    Canvas::new(storage.clone(), env.clone(), StoreConfig::strokes(), chat)
}

fn apply(
    canvas: &mut Canvas<MemoryStorage, SimEnv>,
    storage: &MemoryStorage,
    env: &SimEnv,
    op: &Operation,
) -> Observation {
    let accepted = |ok: bool| if ok { Observation::Accepted } else { Observation::Rejected };

    match *op {
        Operation::Draw { room, stroke } => {
            accepted(canvas.strokes().add_record(&room_id(room), &stroke.to_raw()).is_ok())
        },
        Operation::DrawInvalid { room, missing } => accepted(
            canvas.strokes().add_record(&room_id(room), &invalid_stroke(room, missing)).is_ok(),
        ),
        Operation::Chat { room, message } => {
            accepted(canvas.chat().add_record(&room_id(room), &message.to_raw()).is_ok())
        },
        Operation::ChatBlank { room } => {
            accepted(canvas.chat().add_record(&room_id(room), &blank_chat()).is_ok())
        },
        Operation::Clear { room } => {
            canvas.strokes().clear(&room_id(room));
            Observation::Done
        },
        Operation::GetState { room } => {
            let room = room_id(room);
            Observation::State {
                strokes: canvas.strokes().get_state(&room),
                chat: canvas.chat().get_state(&room),
            }
        },
        Operation::Flush { room } => {
            canvas.flush_room(&room_id(room)).expect("memory storage");
            Observation::Done
        },
        Operation::FlushDirty => {
            canvas.strokes().flush_dirty();
            canvas.chat().flush_dirty();
            Observation::Done
        },
        Operation::Restart => {
            *canvas = open(storage, env);
            Observation::Done
        },
        Operation::AdvanceTime { millis } => {
            env.advance(Duration::from_millis(u64::from(millis)));
            Observation::Done
        },
    }
}
