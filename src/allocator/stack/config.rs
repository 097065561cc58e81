//! Stack allocator configuration.

/// Configuration for [`StackAllocator`](super::StackAllocator).
///
/// Buffer size is passed to the constructor; this struct carries the
/// behavioral knobs.
#[derive(Debug, Clone)]
pub struct StackConfig {
    /// Default cursor alignment. `None` selects pointer size. An explicit
    /// value must be a power of two between `align_of::<u32>()` and
    /// `align_of::<u128>()`.
    pub alignment: Option<usize>,

    /// Whether the allocator may append further buffers of the same size
    /// when the active one fills up.
    pub resizable: bool,

    /// Enable allocation statistics tracking.
    pub track_stats: bool,

    /// Pattern written over an allocation when it is popped, while debug
    /// checks are enabled.
    pub dealloc_pattern: Option<u8>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            alignment: None,
            resizable: false,
            track_stats: cfg!(debug_assertions),
            dealloc_pattern: if cfg!(debug_assertions) { Some(0xDD) } else { None },
        }
    }
}

impl StackConfig {
    /// Production configuration: no tracking, no fill patterns.
    pub fn production() -> Self {
        Self { alignment: None, resizable: false, track_stats: false, dealloc_pattern: None }
    }

    /// Debug configuration: tracking and poison-on-free enabled.
    pub fn debug() -> Self {
        Self { alignment: None, resizable: false, track_stats: true, dealloc_pattern: Some(0xDD) }
    }

    /// Sets the default cursor alignment.
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = Some(alignment);
        self
    }

    /// Allows the allocator to grow by appending buffers.
    pub fn resizable(mut self) -> Self {
        self.resizable = true;
        self
    }
}
