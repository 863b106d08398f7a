//! Chaotic storage wrapper for fault injection testing
//!
//! Wraps another backend and randomly fails reads and writes. The store must
//! keep serving from memory through any of these failures, so the chaos
//! tests drive it through this wrapper and check what survives.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};

use easel_core::{Record, RecordKind, RoomId};

use super::{Storage, StorageError};

/// Chaotic storage wrapper that randomly injects failures
///
/// Delegates to an underlying storage implementation but randomly fails
/// operations based on a configured failure rate. A failed write never
/// reaches the inner backend. Counters are shared across clones.
#[derive(Clone)]
pub struct ChaoticStorage<S: Storage> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    /// RNG state for deterministic chaos
    rng: Arc<Mutex<ChaoticRng>>,
    counters: Arc<Counters>,
}

#[derive(Default)]
struct Counters {
    reads: AtomicUsize,
    writes: AtomicUsize,
    failures: AtomicUsize,
}

/// Linear congruential generator, so a seed always replays the same faults.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next value in [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // Numerical Recipes constants
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        #[allow(clippy::cast_precision_loss, reason = "state < 2^32 fits in f64 exactly")]
        let value = (self.state as f64) / (M as f64);
        value
    }
}

impl<S: Storage> ChaoticStorage<S> {
    /// Create a new chaotic storage wrapper with a fixed default seed.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Create with explicit seed for reproducible chaos
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );

        Self {
            inner,
            failure_rate,
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Underlying storage (for checking what actually landed).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of `read_room` calls attempted.
    pub fn read_count(&self) -> usize {
        self.counters.reads.load(Ordering::SeqCst)
    }

    /// Number of `write_room` calls attempted.
    pub fn write_count(&self) -> usize {
        self.counters.writes.load(Ordering::SeqCst)
    }

    /// Number of injected failures so far.
    pub fn failure_count(&self) -> usize {
        self.counters.failures.load(Ordering::SeqCst)
    }

    /// Total number of storage operations attempted.
    pub fn operation_count(&self) -> usize {
        self.read_count() + self.write_count()
    }

    fn inject(&self) -> Result<(), StorageError> {
        let fail = self.rng.lock().unwrap_or_else(PoisonError::into_inner).next() < self.failure_rate;
        if fail {
            self.counters.failures.fetch_add(1, Ordering::SeqCst);
            return Err(StorageError::Io("chaotic failure injection".to_string()));
        }
        Ok(())
    }
}

impl<S: Storage> Storage for ChaoticStorage<S> {
    fn write_room<R: Record>(&self, room_id: &RoomId, records: &[R]) -> Result<(), StorageError> {
        self.counters.writes.fetch_add(1, Ordering::SeqCst);
        self.inject()?;
        self.inner.write_room(room_id, records)
    }

    fn read_room<R: Record>(&self, room_id: &RoomId) -> Result<Option<Vec<R>>, StorageError> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        self.inject()?;
        self.inner.read_room(room_id)
    }

    fn list_rooms(&self, kind: RecordKind) -> Result<Vec<RoomId>, StorageError> {
        self.inner.list_rooms(kind)
    }
}

#[cfg(test)]
mod tests {
    use easel_core::Stroke;

    use super::*;
    use crate::storage::MemoryStorage;

    fn room() -> RoomId {
        RoomId::new("chaos").unwrap()
    }

    #[test]
    fn test_zero_rate_never_fails() {
        let storage = ChaoticStorage::new(MemoryStorage::new(), 0.0);
        for _ in 0..100 {
            storage.write_room::<Stroke>(&room(), &[]).unwrap();
        }
        assert_eq!(storage.write_count(), 100);
        assert_eq!(storage.failure_count(), 0);
    }

    #[test]
    fn test_full_rate_always_fails_and_skips_inner() {
        let storage = ChaoticStorage::new(MemoryStorage::new(), 1.0);
        let result = storage.write_room::<Stroke>(&room(), &[]);

        assert!(matches!(result, Err(StorageError::Io(_))));
        assert_eq!(storage.inner().document_count(), 0);
        assert_eq!(storage.failure_count(), 1);
    }

    #[test]
    fn test_same_seed_same_faults() {
        let outcomes = |seed| {
            let storage = ChaoticStorage::with_seed(MemoryStorage::new(), 0.5, seed);
            (0..64).map(|_| storage.write_room::<Stroke>(&room(), &[]).is_ok()).collect::<Vec<_>>()
        };

        assert_eq!(outcomes(7), outcomes(7));
        assert!(outcomes(7).contains(&false));
        assert!(outcomes(7).contains(&true));
    }

    #[test]
    fn test_counters_shared_across_clones() {
        let storage = ChaoticStorage::new(MemoryStorage::new(), 0.0);
        let clone = storage.clone();
        let _: Option<Vec<Stroke>> = clone.read_room(&room()).unwrap();

        assert_eq!(storage.read_count(), 1);
        assert_eq!(storage.operation_count(), 1);
    }

    #[test]
    #[should_panic(expected = "failure_rate must be between")]
    fn test_rejects_bad_rate() {
        let _ = ChaoticStorage::new(MemoryStorage::new(), 1.5);
    }
}
