//! Process-wide toggles for expensive safety checks and capacity caps.
//!
//! Two flags, each an atomic boolean loaded with relaxed ordering:
//!
//! - **debug checks** gate the costly correctness passes: the free-list
//!   walk that detects double frees in the pool, the allocation-record
//!   stack of the stack allocator, poison fills and zeroing on reset.
//! - **capacity checks** gate the hard caps enforced when a pool or stack
//!   grows a new region.
//!
//! The flags are atomic so that a benchmark harness can flip them between
//! runs; the allocators themselves are single-owner and never rely on the
//! flags for cross-thread correctness.
//!
//! In builds without `debug_assertions` the debug flag collapses to a
//! compile-time `false` and the capacity flag to `true`; the guards become
//! no-ops.

use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG_CHECKS: AtomicBool = AtomicBool::new(true);
static CAPACITY_CHECKS: AtomicBool = AtomicBool::new(true);

/// Whether the expensive correctness checks are currently enabled.
///
/// Always `false` in builds without `debug_assertions`.
#[inline(always)]
pub fn debug_checks_enabled() -> bool {
    cfg!(debug_assertions) && DEBUG_CHECKS.load(Ordering::Relaxed)
}

/// Whether the hard capacity caps are currently enforced.
///
/// Always `true` in builds without `debug_assertions`.
#[inline(always)]
pub fn capacity_checks_enabled() -> bool {
    !cfg!(debug_assertions) || CAPACITY_CHECKS.load(Ordering::Relaxed)
}

/// Scoped override of the debug-checks flag.
///
/// Saves the previous value on construction and restores it when dropped,
/// on every exit path.
#[derive(Debug)]
pub struct DebugChecksGuard {
    previous: bool,
}

impl DebugChecksGuard {
    /// Sets the debug-checks flag to `enabled` for the guard's lifetime.
    #[must_use = "the override ends when the guard is dropped"]
    pub fn set(enabled: bool) -> Self {
        Self { previous: DEBUG_CHECKS.swap(enabled, Ordering::Relaxed) }
    }
}

impl Drop for DebugChecksGuard {
    fn drop(&mut self) {
        DEBUG_CHECKS.store(self.previous, Ordering::Relaxed);
    }
}

/// Scoped override of the capacity-checks flag.
#[derive(Debug)]
pub struct CapacityChecksGuard {
    previous: bool,
}

impl CapacityChecksGuard {
    /// Sets the capacity-checks flag to `enabled` for the guard's lifetime.
    #[must_use = "the override ends when the guard is dropped"]
    pub fn set(enabled: bool) -> Self {
        Self { previous: CAPACITY_CHECKS.swap(enabled, Ordering::Relaxed) }
    }
}

impl Drop for CapacityChecksGuard {
    fn drop(&mut self) {
        CAPACITY_CHECKS.store(self.previous, Ordering::Relaxed);
    }
}
