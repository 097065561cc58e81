//! # carve-alloc
//!
//! Custom allocators that carve large owned memory regions into blocks,
//! each under a distinct discipline:
//!
//! - [`PoolAllocator`](allocator::PoolAllocator) — fixed-size blocks on an
//!   intrusive free list, growing by whole pools up to a hard cap
//! - [`StackAllocator`](allocator::StackAllocator) — a bump cursor with
//!   LIFO deallocation and O(1) mark/rewind
//! - [`BuddyAllocator`](allocator::BuddyAllocator) — power-of-two
//!   split/merge with per-level free lists and XOR buddy lookup
//!
//! All three implement the common [`Allocator`](allocator::Allocator)
//! contract: `allocate`, `deallocate`, `reset`, `release`,
//! `allocated_size`, `object_size`.
//!
//! ## Quick Start
//!
//! ```rust
//! use carve_alloc::prelude::*;
//!
//! # fn main() -> AllocResult<()> {
//! let mut pool = PoolAllocator::new(64, 128)?;
//! let block = pool.allocate(48)?;
//! // ... use up to 64 bytes behind `block` ...
//! pool.deallocate(block)?;
//! assert_eq!(pool.allocated_size(), 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Ownership model
//!
//! Allocators are single-owner values: every operation takes `&mut self`
//! and completes synchronously, with no internal locking. Pointers they
//! hand out are borrows of their regions, invalidated by `deallocate`,
//! `reset`, `release`, or drop.
//!
//! ## Debug and capacity flags
//!
//! Two process-wide toggles in [`flags`] gate the expensive correctness
//! checks (double-free walks, LIFO records, poison fills) and the hard
//! capacity caps. Both come with scoped guards that restore the previous
//! value on drop, so a benchmark can opt out for a run and leave no trace.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(rust_2018_idioms)]

// Memory allocators - the heart of the crate
pub mod allocator;

// Process-wide debug/capacity toggles
pub mod flags;

// Alignment and power-of-two helpers
pub mod utils;

mod error;
mod region;

pub use crate::error::{AllocError, AllocResult};

/// Convenient re-exports of commonly used types and traits.
pub mod prelude {
    pub use crate::allocator::{
        Allocator, AllocatorStats, BuddyAllocator, BuddyConfig, PoolAllocator, PoolConfig,
        StackAllocator, StackConfig, StackFrame, StackMarker,
    };
    pub use crate::error::{AllocError, AllocResult};
    pub use crate::flags::{CapacityChecksGuard, DebugChecksGuard};
}
