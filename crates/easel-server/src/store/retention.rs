//! Per-room retention policy and store configuration.

use std::{num::NonZeroUsize, time::Duration};

/// Default interval between background flush cycles.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of chat messages kept per room.
pub const DEFAULT_CHAT_HISTORY: NonZeroUsize = match NonZeroUsize::new(50) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

/// How many records a room keeps after each append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Retention {
    /// Keep everything
    #[default]
    Unbounded,
    /// Keep only the most recent `n` records, dropping from the front
    KeepLatest(NonZeroUsize),
}

impl Retention {
    /// Upper bound on room length, if any.
    pub fn limit(self) -> Option<usize> {
        match self {
            Self::Unbounded => None,
            Self::KeepLatest(n) => Some(n.get()),
        }
    }

    /// Trim `records` in place. Returns how many were dropped.
    pub fn apply<T>(self, records: &mut Vec<T>) -> usize {
        let Some(limit) = self.limit() else { return 0 };
        let excess = records.len().saturating_sub(limit);
        records.drain(..excess);
        excess
    }
}

/// Configuration of a single [`RoomStore`](super::RoomStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Interval between background flush cycles
    pub flush_interval: Duration,
    /// Retention applied after every append
    pub retention: Retention,
    /// Re-mark a room dirty when its background write fails, so the next
    /// cycle tries again. Off by default: a failed write is logged and the
    /// room is only persisted again after its next mutation.
    pub retry_failed_flushes: bool,
}

impl StoreConfig {
    /// Stroke store defaults: unbounded history.
    pub fn strokes() -> Self {
        Self {
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            retention: Retention::Unbounded,
            retry_failed_flushes: false,
        }
    }

    /// Chat store defaults: the latest 50 messages.
    pub fn chat() -> Self {
        Self { retention: Retention::KeepLatest(DEFAULT_CHAT_HISTORY), ..Self::strokes() }
    }

    /// Builder-style flush interval.
    #[must_use]
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Builder-style retention.
    #[must_use]
    pub fn with_retention(mut self, retention: Retention) -> Self {
        self.retention = retention;
        self
    }

    /// Builder-style retry switch.
    #[must_use]
    pub fn with_retry_failed_flushes(mut self, retry: bool) -> Self {
        self.retry_failed_flushes = retry;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::strokes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keep(n: usize) -> Retention {
        Retention::KeepLatest(NonZeroUsize::new(n).unwrap())
    }

    #[test]
    fn unbounded_keeps_everything() {
        let mut v: Vec<u32> = (0..100).collect();
        assert_eq!(Retention::Unbounded.apply(&mut v), 0);
        assert_eq!(v.len(), 100);
    }

    #[test]
    fn keep_latest_drops_oldest() {
        let mut v: Vec<u32> = (0..10).collect();
        assert_eq!(keep(5).apply(&mut v), 5);
        assert_eq!(v, vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn keep_latest_under_limit_is_noop() {
        let mut v = vec![1, 2];
        assert_eq!(keep(5).apply(&mut v), 0);
        assert_eq!(v, vec![1, 2]);
    }

    #[test]
    fn defaults() {
        assert_eq!(StoreConfig::strokes().retention, Retention::Unbounded);
        assert_eq!(StoreConfig::chat().retention.limit(), Some(50));
        assert_eq!(StoreConfig::chat().flush_interval, Duration::from_secs(5));
        assert!(!StoreConfig::chat().retry_failed_flushes);
    }
}
