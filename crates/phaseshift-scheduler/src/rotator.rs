//! Round-robin resource rotator.
//!
//! Hands out a fixed set of resources in strict rotation using an atomic
//! counter. Lock-free and safe for concurrent access.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::RotatorError;

/// Cycles through a fixed, ordered, non-empty list of resources.
///
/// Each call to [`next`](Self::next) advances the counter in a single
/// `fetch_add`, so concurrent callers together observe the sequence
/// 0, 1, …, N−1, 0, … with no index skipped or repeated.
pub struct Rotator<R> {
    resources: Vec<R>,
    counter: AtomicUsize,
}

impl<R> Rotator<R> {
    pub fn new(resources: Vec<R>) -> Result<Self, RotatorError> {
        if resources.is_empty() {
            return Err(RotatorError::Empty);
        }
        Ok(Self {
            resources,
            counter: AtomicUsize::new(0),
        })
    }

    /// The next resource in rotation.
    pub fn next(&self) -> &R {
        let idx = self.counter.fetch_add(1, Ordering::Relaxed);
        &self.resources[idx % self.resources.len()]
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Always false; construction rejects an empty list.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn resources(&self) -> &[R] {
        &self.resources
    }

    /// Current counter value (for diagnostics).
    pub fn current(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }
}
