//! Deterministic test harness for Easel stores.
//!
//! # Virtual time
//!
//! [`SimEnv`] implements [`Environment`](easel_core::Environment) with a
//! clock that only moves when told to, so chat timestamps and flush timing
//! are reproducible.
//!
//! # Model-based testing
//!
//! The [`model`] module provides a reference implementation of the stroke
//! and chat stores over a perfect storage backend. Operations are applied to
//! both the model and the real stores, and their observations are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;
pub mod sim_env;

pub use model::{
    MODEL_CHAT_HISTORY, ModelCanvas, ModelRoomId, ModelStore, Observation, Operation, SmallChat,
    SmallStroke, blank_chat, invalid_stroke, room_id,
};
pub use sim_env::{SimEnv, SimInstant};
