//! Pool allocator configuration.

/// Configuration for [`PoolAllocator`](super::PoolAllocator).
///
/// Block geometry (size and count) is passed to the constructor; this
/// struct carries the behavioral knobs.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Block alignment. `None` selects the default (pointer size). An
    /// explicit value must be a power of two between `align_of::<u32>()`
    /// and `align_of::<u128>()`.
    pub alignment: Option<usize>,

    /// Maximum number of pools the allocator may grow to. `None` means
    /// unlimited (the 64 MiB total-capacity cap still applies).
    pub max_pools: Option<usize>,

    /// Enable allocation statistics tracking.
    pub track_stats: bool,

    /// Pattern written over a block when it is freed, while debug checks
    /// are enabled. Makes use-after-free stand out in a debugger.
    pub dealloc_pattern: Option<u8>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            alignment: None,
            max_pools: None,
            track_stats: cfg!(debug_assertions),
            dealloc_pattern: if cfg!(debug_assertions) { Some(0xDD) } else { None },
        }
    }
}

impl PoolConfig {
    /// Production configuration: no tracking, no fill patterns.
    pub fn production() -> Self {
        Self { alignment: None, max_pools: None, track_stats: false, dealloc_pattern: None }
    }

    /// Debug configuration: tracking and poison-on-free enabled.
    pub fn debug() -> Self {
        Self { alignment: None, max_pools: None, track_stats: true, dealloc_pattern: Some(0xDD) }
    }

    /// Sets the block alignment.
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = Some(alignment);
        self
    }

    /// Caps the number of pools the allocator may grow to.
    pub fn with_max_pools(mut self, max_pools: usize) -> Self {
        self.max_pools = Some(max_pools);
        self
    }
}
