//! Synchronization primitives used by the engine.
//!
//! Locks are re-exported from the battle-tested `parking_lot` crate: no
//! poisoning on panic (a panicking callable must not poison a future's
//! result lock), compact footprint, fast uncontended paths.
//!
//! [`Gate`] is the weighted admission semaphore bounding how many futures a
//! scheduler executes simultaneously. The unlimited case is a variant of the
//! type rather than a null pointer, so every call site handles it uniformly.
//!
//! # Examples
//!
//! ```
//! use future_sched::sync::Mutex;
//!
//! let slot = Mutex::new(0);
//! *slot.lock() = 7;
//! assert_eq!(*slot.lock(), 7);
//! ```

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::require;

pub use parking_lot::{
    MappedMutexGuard, MappedRwLockReadGuard, MappedRwLockWriteGuard, Mutex, MutexGuard, RwLock,
    RwLockReadGuard, RwLockWriteGuard,
};

/// Admission gate bounding how many executions may run at once.
///
/// A gate is cheap to clone; clones share the same capacity. An unbounded
/// gate admits every caller immediately.
#[derive(Clone, Debug)]
pub struct Gate {
    sem: Option<Arc<Semaphore>>,
}

impl Gate {
    /// Gate that admits everything.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self { sem: None }
    }

    /// Gate admitting at most `limit` concurrent holders.
    ///
    /// # Panics
    ///
    /// Panics with a parameter rejection if `limit` is zero.
    #[must_use]
    pub fn bounded(limit: usize) -> Self {
        require(limit > 0, "gate capacity must be positive");
        Self {
            sem: Some(Arc::new(Semaphore::new(limit))),
        }
    }

    /// Whether a capacity bound is installed.
    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        self.sem.is_some()
    }

    /// Acquire one admission unit, waiting while the gate is at capacity.
    ///
    /// Returns `None` when the gate is unbounded; otherwise the unit is
    /// released when the returned permit drops.
    pub async fn admit(&self) -> Option<OwnedSemaphorePermit> {
        match &self.sem {
            Some(sem) => Arc::clone(sem).acquire_owned().await.ok(),
            None => None,
        }
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_mutex_concurrent_access() {
        let counter = Arc::new(Mutex::new(0));
        let mut handles = vec![];

        for _ in 0..8 {
            let counter = Arc::clone(&counter);
            handles.push(thread::spawn(move || {
                *counter.lock() += 1;
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*counter.lock(), 8);
    }

    #[test]
    fn test_rwlock_readers() {
        let value = RwLock::new(5);
        let a = value.read();
        let b = value.read();
        assert_eq!(*a + *b, 10);
    }

    #[test]
    fn test_gate_unbounded_by_default() {
        let gate = Gate::default();
        assert!(!gate.is_bounded());
    }

    #[tokio::test]
    async fn test_gate_unbounded_admits_without_permit() {
        let gate = Gate::unbounded();
        assert!(gate.admit().await.is_none());
    }

    #[tokio::test]
    async fn test_gate_bounded_blocks_at_capacity() {
        let gate = Gate::bounded(2);
        let first = gate.admit().await;
        let second = gate.admit().await;
        assert!(first.is_some());
        assert!(second.is_some());

        // Third admission only proceeds once a permit is returned.
        let waited =
            tokio::time::timeout(std::time::Duration::from_millis(50), gate.admit()).await;
        assert!(waited.is_err());

        drop(first);
        let third =
            tokio::time::timeout(std::time::Duration::from_millis(500), gate.admit()).await;
        assert!(third.is_ok());
    }

    #[test]
    #[should_panic(expected = "parameter error")]
    fn test_gate_zero_capacity_rejected() {
        let _ = Gate::bounded(0);
    }
}
