//! Buddy allocator configuration.

/// Configuration for [`BuddyAllocator`](super::BuddyAllocator).
///
/// The buddy allocator has no alignment or growth knobs: blocks are
/// naturally aligned to their own size within the buffer, and the buffer
/// never grows.
#[derive(Debug, Clone)]
pub struct BuddyConfig {
    /// Enable allocation statistics tracking.
    pub track_stats: bool,

    /// Pattern written over a block when it is freed, while debug checks
    /// are enabled.
    pub dealloc_pattern: Option<u8>,
}

impl Default for BuddyConfig {
    fn default() -> Self {
        Self {
            track_stats: cfg!(debug_assertions),
            dealloc_pattern: if cfg!(debug_assertions) { Some(0xDD) } else { None },
        }
    }
}

impl BuddyConfig {
    /// Production configuration: no tracking, no fill patterns.
    pub fn production() -> Self {
        Self { track_stats: false, dealloc_pattern: None }
    }

    /// Debug configuration: tracking and poison-on-free enabled.
    pub fn debug() -> Self {
        Self { track_stats: true, dealloc_pattern: Some(0xDD) }
    }
}
