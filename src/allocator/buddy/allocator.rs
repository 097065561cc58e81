//! Main buddy allocator implementation.
//!
//! # Safety
//!
//! Free blocks at every level store a next-free link in their own first
//! bytes (see [`crate::region`]); allocated blocks carry no bookkeeping,
//! their levels live in the allocation index instead.
//!
//! ## Invariants
//!
//! - The bytes covered by allocated blocks and by free-list blocks across
//!   all levels partition the buffer exactly once
//! - Every free block of size `s` sits at an offset aligned to `s`: the
//!   buffer itself is a power of two, and splitting a block aligned to
//!   `2s` yields children at offsets `0` and `s` within it
//! - After any deallocation no two free buddies remain at the same level
//!   (they would have been merged)
//! - The free list at level `k` holds only blocks of size
//!   `MIN_CAPACITY << k`

use std::collections::HashMap;
use std::ptr::NonNull;

use tracing::{debug, trace};

use super::BuddyConfig;
use crate::allocator::{Allocator, AllocatorStats, StatsTracker};
use crate::error::{AllocError, AllocResult};
use crate::flags::debug_checks_enabled;
use crate::region::{read_link, write_link, Region};
use crate::utils::{log2_power_of_two, next_power_of_two};

/// Smallest block the allocator hands out, and the smallest buffer it
/// accepts: 1 KiB.
pub const MIN_CAPACITY: usize = 1024;

/// Largest buffer the allocator accepts: 128 MiB.
pub const MAX_CAPACITY: usize = 128 * 1024 * 1024;

/// Number of size classes: 1 KiB through 128 MiB, levels 0 to 17.
const LEVEL_COUNT: usize = 18;

/// Buffer base alignment. A page boundary keeps even the smallest blocks
/// at friendly absolute addresses; within the buffer, block alignment
/// follows from the power-of-two layout alone.
const REGION_ALIGNMENT: usize = 4096;

/// Block size at `level`: `MIN_CAPACITY << level`.
#[inline]
const fn size_at_level(level: usize) -> usize {
    MIN_CAPACITY << level
}

/// Level whose block size is the smallest that fits `size`.
///
/// `size` is rounded up to the next power of two and floored at
/// [`MIN_CAPACITY`].
#[inline]
fn level_of(size: usize) -> usize {
    let rounded = next_power_of_two(size.max(MIN_CAPACITY));
    (log2_power_of_two(rounded) - log2_power_of_two(MIN_CAPACITY)) as usize
}

/// Binary buddy allocator over one power-of-two buffer.
///
/// Alignment arguments to `allocate` are accepted for interface
/// compatibility and ignored: every block's offset within the buffer is a
/// multiple of its own (power-of-two) size.
///
/// # Block state machine
///
/// Each region of the buffer is either *allocated*, *free at some level*,
/// or covered by a larger free block / split into smaller ones. Allocation
/// pops a free block (splitting larger ones as needed); deallocation
/// pushes it back and merges sibling pairs upward while both halves are
/// free.
pub struct BuddyAllocator {
    /// Buffer size, rounded up to a power of two at construction.
    buffer_size: usize,

    /// Level of the whole buffer; no block above this level exists.
    initial_level: usize,

    /// The backing buffer. `None` after `release`.
    region: Option<Region>,

    /// One singly-linked free list per level, threaded through the free
    /// blocks' own bytes. Insertion is LIFO.
    free_lists: [*mut u8; LEVEL_COUNT],

    /// Live allocations: block address to level.
    allocated: HashMap<usize, usize>,

    config: BuddyConfig,
    stats: StatsTracker,
    name: String,
}

impl BuddyAllocator {
    /// Creates a buddy allocator with custom configuration.
    ///
    /// `buffer_size` must lie in `[1 KiB, 128 MiB]` and is rounded up to
    /// the next power of two.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::InvalidArgument`] if `buffer_size` is out of
    /// range.
    pub fn with_config(buffer_size: usize, config: BuddyConfig) -> AllocResult<Self> {
        let name = "buddy_allocator".to_string();

        if buffer_size < MIN_CAPACITY || buffer_size > MAX_CAPACITY {
            return Err(AllocError::invalid_argument(
                &name,
                format!(
                    "buffer size must be between {} KiB and {} MiB",
                    MIN_CAPACITY / 1024,
                    MAX_CAPACITY / (1024 * 1024)
                ),
            ));
        }

        let buffer_size = next_power_of_two(buffer_size);
        let initial_level = level_of(buffer_size);

        let mut allocator = Self {
            buffer_size,
            initial_level,
            region: None,
            free_lists: [std::ptr::null_mut(); LEVEL_COUNT],
            allocated: HashMap::new(),
            config,
            stats: StatsTracker::default(),
            name,
        };
        allocator.acquire_buffer();
        Ok(allocator)
    }

    /// Creates a buddy allocator with default configuration.
    pub fn new(buffer_size: usize) -> AllocResult<Self> {
        Self::with_config(buffer_size, BuddyConfig::default())
    }

    /// Buffer size after power-of-two rounding.
    pub fn capacity(&self) -> usize {
        self.buffer_size
    }

    /// Level of the whole buffer.
    pub fn initial_level(&self) -> usize {
        self.initial_level
    }

    /// Number of free blocks currently on the free list at `level`.
    pub fn free_blocks_at(&self, level: usize) -> usize {
        let mut count = 0;
        let mut walk = self.free_lists.get(level).copied().unwrap_or(std::ptr::null_mut());
        while !walk.is_null() {
            count += 1;
            // SAFETY: walk traverses the level's free list; every node
            // holds a link written by push_free.
            walk = unsafe { read_link(walk) };
        }
        count
    }

    /// Statistics snapshot, if tracking is enabled.
    pub fn stats(&self) -> Option<AllocatorStats> {
        self.config
            .track_stats
            .then(|| self.stats.snapshot(self.allocated_size()))
    }

    /// Acquires a fresh buffer and seeds the free lists with it.
    fn acquire_buffer(&mut self) {
        let region = Region::new(self.buffer_size, REGION_ALIGNMENT);
        let base = region.base();
        self.region = Some(region);
        self.free_lists = [std::ptr::null_mut(); LEVEL_COUNT];
        self.allocated.clear();
        self.push_free(base, self.initial_level);
        debug!(
            allocator = %self.name,
            buffer_size = self.buffer_size,
            initial_level = self.initial_level,
            "acquired buffer"
        );
    }

    /// Pushes a block onto the free list at `level`.
    fn push_free(&mut self, block: *mut u8, level: usize) {
        // SAFETY: block starts a free level-sized region inside the
        // buffer; its first bytes become the free-list link.
        unsafe {
            write_link(block, self.free_lists[level]);
        }
        self.free_lists[level] = block;
    }

    /// Pops the head of the free list at `level`.
    fn pop_free(&mut self, level: usize) -> Option<*mut u8> {
        let head = self.free_lists[level];
        if head.is_null() {
            return None;
        }
        // SAFETY: head is on the free list, so it holds a valid link.
        self.free_lists[level] = unsafe { read_link(head) };
        Some(head)
    }

    /// Unlinks `block` from the free list at `level`.
    ///
    /// Returns `false` if the block is not on that list.
    fn remove_free(&mut self, block: *mut u8, level: usize) -> bool {
        let head = self.free_lists[level];
        if head.is_null() {
            return false;
        }
        if head == block {
            // SAFETY: head is a free-list node.
            self.free_lists[level] = unsafe { read_link(head) };
            return true;
        }

        let mut current = head;
        loop {
            // SAFETY: current walks the free list; every node holds a link.
            let next = unsafe { read_link(current) };
            if next.is_null() {
                return false;
            }
            if next == block {
                // SAFETY: both nodes are on the list; relink around block.
                unsafe {
                    write_link(current, read_link(block));
                }
                return true;
            }
            current = next;
        }
    }

    /// Merges the freed block upward while its buddy is also free.
    ///
    /// The buddy of a block at offset `o` and level `k` sits at offset
    /// `o XOR size_at_level(k)`; it exists only below the initial level
    /// and within the buffer. A merge is attempted only when the buddy is
    /// actually present on the same-level free list.
    fn coalesce(&mut self, block: *mut u8, level: usize) -> AllocResult<()> {
        let (base, buffer_size) = match &self.region {
            Some(region) => (region.base(), region.len()),
            None => return Ok(()),
        };

        let mut block = block;
        let mut level = level;
        while level < self.initial_level {
            let offset = block as usize - base as usize;
            let buddy_offset = offset ^ size_at_level(level);
            if buddy_offset >= buffer_size {
                break;
            }
            // SAFETY: buddy_offset < buffer_size, so the address stays in
            // the region.
            let buddy = unsafe { base.add(buddy_offset) };

            // The buddy may be allocated, or split into smaller pieces; in
            // either case it is absent from this level's list and the
            // merge stops here.
            if !self.remove_free(buddy, level) {
                break;
            }
            if !self.remove_free(block, level) {
                return Err(AllocError::internal(
                    &self.name,
                    "freed block missing from its free list during merge",
                ));
            }

            let merged = if (block as usize) < (buddy as usize) { block } else { buddy };
            self.push_free(merged, level + 1);
            trace!(
                allocator = %self.name,
                level,
                merged_size = size_at_level(level + 1),
                "merged buddies"
            );

            block = merged;
            level += 1;
        }
        Ok(())
    }
}

impl Allocator for BuddyAllocator {
    fn allocate_aligned(
        &mut self,
        size: usize,
        _alignment: Option<usize>,
    ) -> AllocResult<NonNull<u8>> {
        // Alignment is ignored: blocks are naturally aligned to their own
        // size within the buffer.
        if self.region.is_none() {
            return Err(AllocError::released(&self.name));
        }
        if size > self.buffer_size {
            return Err(AllocError::capacity_exceeded(
                &self.name,
                format!("requested size exceeds buffer size ({} bytes)", self.buffer_size),
            ));
        }

        let target_level = level_of(size);
        let block = match self.pop_free(target_level) {
            Some(block) => block,
            None => {
                // Split the closest larger free block down to the target.
                let source_level = (target_level + 1..LEVEL_COUNT)
                    .find(|&level| !self.free_lists[level].is_null())
                    .ok_or_else(|| {
                        AllocError::capacity_exceeded(
                            &self.name,
                            format!(
                                "no sufficient block available for allocation ({} bytes)",
                                size_at_level(target_level)
                            ),
                        )
                    })?;

                let block = self.pop_free(source_level).ok_or_else(|| {
                    AllocError::internal(&self.name, "expected a free block during split")
                })?;

                let mut level = source_level;
                while level > target_level {
                    let half = size_at_level(level - 1);
                    // SAFETY: block spans size_at_level(level) bytes inside
                    // the buffer, so its upper half starts within it.
                    let upper_half = unsafe { block.add(half) };
                    self.push_free(upper_half, level - 1);
                    trace!(allocator = %self.name, level, half_size = half, "split block");
                    level -= 1;
                }
                block
            }
        };

        self.allocated.insert(block as usize, target_level);
        if self.config.track_stats {
            let current = self.allocated_size();
            self.stats.record_alloc(current);
        }
        NonNull::new(block)
            .ok_or_else(|| AllocError::internal(&self.name, "free list produced a null block"))
    }

    fn deallocate(&mut self, ptr: NonNull<u8>) -> AllocResult<()> {
        if self.region.is_none() {
            return Err(AllocError::released(&self.name));
        }

        let addr = ptr.as_ptr() as usize;
        // Covers foreign pointers, interior pointers and double frees
        // alike: only live block addresses are in the index.
        let level = self.allocated.remove(&addr).ok_or_else(|| {
            AllocError::invalid_argument(&self.name, "pointer not allocated by this allocator")
        })?;

        if debug_checks_enabled() {
            if let Some(pattern) = self.config.dealloc_pattern {
                // SAFETY: the block spans size_at_level(level) bytes inside
                // the buffer and is being freed.
                unsafe {
                    std::ptr::write_bytes(ptr.as_ptr(), pattern, size_at_level(level));
                }
            }
        }

        self.push_free(ptr.as_ptr(), level);
        self.coalesce(ptr.as_ptr(), level)?;

        if self.config.track_stats {
            self.stats.record_dealloc();
        }
        Ok(())
    }

    fn reset(&mut self) {
        if let Some(region) = self.region.as_mut() {
            if debug_checks_enabled() {
                region.zero();
            }
            let base = region.base();
            self.allocated.clear();
            self.free_lists = [std::ptr::null_mut(); LEVEL_COUNT];
            self.push_free(base, self.initial_level);
        } else {
            self.acquire_buffer();
        }
        self.stats.reset();
        debug!(allocator = %self.name, "reset");
    }

    fn release(&mut self) {
        self.region = None;
        self.allocated.clear();
        self.free_lists = [std::ptr::null_mut(); LEVEL_COUNT];
        debug!(allocator = %self.name, "released buffer");
    }

    fn allocated_size(&self) -> usize {
        self.allocated.values().map(|&level| size_at_level(level)).sum()
    }

    fn object_size(&self) -> Option<usize> {
        // Live allocation sizes are not tracked per object.
        None
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for BuddyAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuddyAllocator")
            .field("name", &self.name)
            .field("buffer_size", &self.buffer_size)
            .field("initial_level", &self.initial_level)
            .field("live_allocations", &self.allocated.len())
            .field("owns_memory", &self.region.is_some())
            .finish()
    }
}
