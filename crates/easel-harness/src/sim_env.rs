//! Virtual-time environment.
//!
//! The clock starts at a fixed wall-clock epoch and advances only through
//! [`SimEnv::advance`]. Clones share the clock, so a test can hand one clone
//! to a store and move time with another.

use std::{
    ops::Sub,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::{DateTime, TimeDelta, Utc};
use easel_core::Environment;

/// Wall-clock time at virtual instant zero: 2023-11-14T22:13:20Z.
pub const SIM_EPOCH_SECS: i64 = 1_700_000_000;

/// Instant on the virtual clock, as time since the simulation started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Time since the simulation started.
    pub fn since_start(self) -> Duration {
        self.0
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

/// Deterministic environment with a manually advanced clock.
#[derive(Clone, Debug)]
pub struct SimEnv {
    /// Nanoseconds since start
    elapsed_nanos: Arc<AtomicU64>,
    epoch: DateTime<Utc>,
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEnv {
    /// Clock at zero, wall clock at [`SIM_EPOCH_SECS`].
    pub fn new() -> Self {
        Self::starting_at(DateTime::from_timestamp(SIM_EPOCH_SECS, 0).unwrap_or(DateTime::UNIX_EPOCH))
    }

    /// Clock at zero, wall clock at `epoch`.
    pub fn starting_at(epoch: DateTime<Utc>) -> Self {
        Self { elapsed_nanos: Arc::new(AtomicU64::new(0)), epoch }
    }

    /// Move the clock forward. Saturates after roughly 584 years.
    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        let _ = self.elapsed_nanos.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
            Some(current.saturating_add(nanos))
        });
    }

    /// Time since the simulation started.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::SeqCst))
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        SimInstant(self.elapsed())
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        let offset = TimeDelta::from_std(self.elapsed()).unwrap_or(TimeDelta::MAX);
        self.epoch.checked_add_signed(offset).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
