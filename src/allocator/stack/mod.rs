//! Stack allocator with LIFO deallocation.
//!
//! A bump cursor inside one or more equally-sized linear buffers.
//! Deallocation must happen in reverse allocation order; a
//! [`StackMarker`] captures the cursor so many allocations can be rewound
//! in O(1).
//!
//! ## Modules
//! - `allocator` - Main `StackAllocator` implementation
//! - `config` - Configuration (alignment, resizability, debug knobs)
//! - `frame` - RAII helper for automatic rewind
//! - `marker` - Cursor snapshots for scoped deallocation

pub mod allocator;
pub mod config;
pub mod frame;
pub mod marker;

pub use allocator::{StackAllocator, MAX_CAPACITY};
pub use config::StackConfig;
pub use frame::StackFrame;
pub use marker::StackMarker;
