//! Atomic flags shared concurrently by every worker engine (spec §4.9).
//!
//! `std::sync::atomic` primitives directly, with no cache-line padding:
//! this solver's per-placement atomic traffic is far lower-frequency
//! than a chess engine's per-node traffic (SPEC_FULL.md §4.9), so the
//! false-sharing optimization is not warranted here.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Solution-found flag, global max depth, and cancellation: the only
/// state read concurrently by all worker engines (spec §3 "SharedState").
#[derive(Debug, Default)]
pub struct SharedState {
    solution_found: AtomicBool,
    global_max_depth: AtomicU32,
    cancel: AtomicBool,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the solution-found flag. Returns `true` if *this* call was
    /// the first to set it (spec §4.9, §8 property 9).
    pub fn mark_solution_found(&self) -> bool {
        self.solution_found
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_solution_found(&self) -> bool {
        self.solution_found.load(Ordering::Acquire)
    }

    /// Updates the monotonically increasing global max depth via a
    /// compare-and-swap loop that keeps the maximum (spec §4.8, §8
    /// property 8).
    pub fn observe_depth(&self, depth: u32) {
        let mut current = self.global_max_depth.load(Ordering::Acquire);
        while depth > current {
            match self.global_max_depth.compare_exchange_weak(
                current,
                depth,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    pub fn global_max_depth(&self) -> u32 {
        self.global_max_depth.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }
}

/// A small `Clone`-able handle passed into `search()`, wrapping the
/// shared atomics (spec §9 "CancelToken"). Deadline expiry is not
/// tracked here — the engine polls `Clock::deadline_exceeded()`
/// directly alongside this token (see `engine.rs::search`), since a
/// monotonic clock comparison is cheaper and simpler than a second
/// atomic flag flipped by a dedicated timer thread.
#[derive(Clone)]
pub struct CancelToken {
    shared: std::sync::Arc<SharedState>,
}

impl CancelToken {
    pub fn new(shared: std::sync::Arc<SharedState>) -> Self {
        Self { shared }
    }

    /// True if cancelled or any worker already found a solution. Callers
    /// also check `Clock::deadline_exceeded()` separately for the
    /// deadline-exceeded cause (spec §5 "Cancellation").
    pub fn is_triggered(&self) -> bool {
        self.shared.is_cancelled() || self.shared.is_solution_found()
    }

    pub fn shared(&self) -> &SharedState {
        &self.shared
    }
}
