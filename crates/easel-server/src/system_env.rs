//! Production Environment implementation using system clocks.
//!
//! `SystemEnv` reads the monotonic clock for durations and the UTC wall
//! clock for chat timestamps. Both advance on their own, so anything built
//! on it is not reproducible; tests that care use the harness clock.

use chrono::{DateTime, Utc};
use easel_core::Environment;

/// Production environment using the system clocks.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    #[allow(clippy::disallowed_methods)]
    fn wall_clock(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
