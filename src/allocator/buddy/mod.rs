//! Binary buddy allocator.
//!
//! Manages one power-of-two buffer through split and merge: a request is
//! served from the smallest block size class that fits, splitting larger
//! blocks on the way down; a freed block coalesces with its buddy whenever
//! the buddy is free at the same level, halving fragmentation on the way
//! back up.
//!
//! ## Modules
//! - `allocator` - Main `BuddyAllocator` implementation
//! - `config` - Configuration (debug knobs)

pub mod allocator;
pub mod config;

pub use allocator::{BuddyAllocator, MAX_CAPACITY, MIN_CAPACITY};
pub use config::BuddyConfig;
