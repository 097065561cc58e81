//! Custom allocators over owned memory regions.
//!
//! Three disciplines share the [`Allocator`] contract:
//! - [`pool`] — fixed-size blocks on an intrusive free list
//! - [`stack`] — bump cursor with LIFO deallocation and mark/rewind
//! - [`buddy`] — power-of-two split/merge with per-level free lists

mod stats;
mod traits;

// Allocator implementations
pub mod buddy;
pub mod pool;
pub mod stack;

pub use buddy::{BuddyAllocator, BuddyConfig};
pub use pool::{PoolAllocator, PoolConfig};
pub use stack::{StackAllocator, StackConfig, StackFrame, StackMarker};

pub use crate::error::{AllocError, AllocResult};
pub use stats::AllocatorStats;
pub use traits::Allocator;

pub(crate) use stats::StatsTracker;

/// Default block/cursor alignment when none is configured: pointer size.
pub(crate) const DEFAULT_ALIGNMENT: usize = std::mem::size_of::<*mut u8>();

/// Smallest alignment accepted from configuration or per-call overrides.
pub(crate) const MIN_ALIGNMENT: usize = std::mem::align_of::<u32>();

/// Largest alignment accepted from configuration.
pub(crate) const MAX_ALIGNMENT: usize = std::mem::align_of::<u128>();

/// Resolves a configured default alignment, validating explicit values.
pub(crate) fn resolve_default_alignment(
    name: &str,
    alignment: Option<usize>,
) -> AllocResult<usize> {
    match alignment {
        None => Ok(DEFAULT_ALIGNMENT),
        Some(alignment) => {
            if !crate::utils::is_power_of_two(alignment) {
                return Err(AllocError::invalid_argument(
                    name,
                    "alignment must be a power of two",
                ));
            }
            if alignment < MIN_ALIGNMENT || alignment > MAX_ALIGNMENT {
                return Err(AllocError::invalid_argument(
                    name,
                    format!(
                        "alignment must be between {MIN_ALIGNMENT} and {MAX_ALIGNMENT} bytes"
                    ),
                ));
            }
            Ok(alignment)
        }
    }
}
