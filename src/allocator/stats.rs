//! Allocation statistics shared by all allocators.

/// Snapshot of an allocator's counters.
///
/// Returned by each allocator's `stats()` when tracking is enabled in its
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocatorStats {
    /// Number of successful allocations since creation or the last reset.
    pub allocation_count: u64,
    /// Number of successful deallocations since creation or the last reset.
    pub deallocation_count: u64,
    /// Bytes currently allocated.
    pub current_usage: usize,
    /// Highest value `current_usage` has reached.
    pub peak_usage: usize,
}

impl std::fmt::Display for AllocatorStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "allocs: {}, deallocs: {}, current: {} bytes, peak: {} bytes",
            self.allocation_count, self.deallocation_count, self.current_usage, self.peak_usage
        )
    }
}

/// Internal counter state backing [`AllocatorStats`].
#[derive(Debug, Default)]
pub(crate) struct StatsTracker {
    allocations: u64,
    deallocations: u64,
    peak_usage: usize,
}

impl StatsTracker {
    pub(crate) fn record_alloc(&mut self, current_usage: usize) {
        self.allocations += 1;
        if current_usage > self.peak_usage {
            self.peak_usage = current_usage;
        }
    }

    pub(crate) fn record_dealloc(&mut self) {
        self.deallocations += 1;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn snapshot(&self, current_usage: usize) -> AllocatorStats {
        AllocatorStats {
            allocation_count: self.allocations,
            deallocation_count: self.deallocations,
            current_usage,
            peak_usage: self.peak_usage.max(current_usage),
        }
    }
}
