//! Environment abstraction for deterministic testing.
//!
//! Decouples record construction and the store from system time. Production
//! code uses the real clocks; tests and the simulation harness substitute a
//! virtual clock so chat timestamps and flush timings are reproducible.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

/// Abstract environment providing monotonic and wall-clock time.
///
/// # Invariants
///
/// Implementations MUST guarantee that `now()` never goes backwards within a
/// single execution context.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, simulation
    /// environments use virtual time.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current monotonic time. Used for measuring durations only.
    fn now(&self) -> Self::Instant;

    /// Current wall-clock time.
    fn wall_clock(&self) -> DateTime<Utc>;

    /// ISO-8601 timestamp of the current wall-clock time.
    ///
    /// This is what chat messages carry when the client did not supply one.
    fn timestamp(&self) -> String {
        self.wall_clock().to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}
