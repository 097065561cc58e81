//! Main pool allocator implementation.
//!
//! # Safety
//!
//! The pool carves each region into `block_count` blocks of
//! `aligned_block_size` bytes and threads a singly-linked free list through
//! the free blocks' first bytes (see [`crate::region`]).
//!
//! ## Invariants
//!
//! - For every pool, `allocated_count + free_count == block_count`
//! - The free list holds exactly `free_count` distinct addresses, all on
//!   `aligned_block_size` boundaries inside the pool
//! - A block address appears on at most one free list
//! - `aligned_block_size >= size_of::<*mut u8>()`, so every free block can
//!   hold its own link

use std::ptr::NonNull;

use tracing::debug;

use super::PoolConfig;
use crate::allocator::{resolve_default_alignment, Allocator, AllocatorStats, StatsTracker};
use crate::error::{AllocError, AllocResult};
use crate::flags::{capacity_checks_enabled, debug_checks_enabled};
use crate::region::{read_link, write_link, Region};
use crate::utils::align_size;

/// Hard cap on the total bytes a pool allocator may own.
pub const MAX_CAPACITY: usize = 64 * 1024 * 1024;

/// Regions are over-aligned to a cache line so blocks land on their
/// configured boundary regardless of what the system allocator returns.
const REGION_ALIGNMENT: usize = 64;

/// One fixed-size region carved into blocks.
struct Pool {
    region: Region,
    free_list_head: *mut u8,
    allocated_count: usize,
    free_count: usize,
}

impl Pool {
    fn new(pool_size: usize, block_size: usize, block_count: usize, alignment: usize) -> Self {
        let region = Region::new(pool_size, alignment.max(REGION_ALIGNMENT));
        let mut pool =
            Self { region, free_list_head: std::ptr::null_mut(), allocated_count: 0, free_count: 0 };
        pool.thread_free_list(block_size, block_count);
        pool
    }

    /// Rebuilds the free list from scratch: every block becomes free.
    fn thread_free_list(&mut self, block_size: usize, block_count: usize) {
        let mut head = std::ptr::null_mut();
        for index in 0..block_count {
            // SAFETY: index * block_size < pool size, and every block is at
            // least pointer-sized and pointer-aligned (region base is
            // over-aligned, block_size is a multiple of the alignment).
            unsafe {
                let block = self.region.base().add(index * block_size);
                write_link(block, head);
                head = block;
            }
        }
        self.free_list_head = head;
        self.allocated_count = 0;
        self.free_count = block_count;
    }
}

/// Pool allocator for fixed-size blocks.
///
/// All allocations are served from equally-sized blocks. When every pool is
/// exhausted the allocator appends another pool of the same geometry, up to
/// `max_pools` and the 64 MiB total cap.
///
/// # Memory Layout
/// ```text
/// pool 0: [Block0][Block1][Block2]...[BlockN]
///            |       |                  |
///          free --> free --> ... --> free --> null
/// pool 1: ... (appended on demand)
/// ```
pub struct PoolAllocator {
    /// Effective block size: the requested size rounded up to the block
    /// alignment, floored at pointer size.
    block_size: usize,

    /// Blocks per pool.
    block_count: usize,

    /// Block alignment.
    alignment: usize,

    /// Bytes per pool (`block_size * block_count`).
    pool_size: usize,

    /// Owned pools, in creation order. Allocation scans them first-fit.
    pools: Vec<Pool>,

    /// False only after `release`.
    owns_memory: bool,

    config: PoolConfig,
    stats: StatsTracker,
    name: String,
}

impl PoolAllocator {
    /// Creates a pool allocator with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::InvalidArgument`] if `block_size` or
    /// `block_count` is zero, the configured alignment is invalid, or a
    /// single pool would exceed the 64 MiB cap.
    pub fn with_config(
        block_size: usize,
        block_count: usize,
        config: PoolConfig,
    ) -> AllocResult<Self> {
        let name = "pool_allocator".to_string();

        if block_size == 0 || block_count == 0 {
            return Err(AllocError::invalid_argument(
                &name,
                "block size and block count must be greater than zero",
            ));
        }

        let alignment = resolve_default_alignment(&name, config.alignment)?;

        // Every free block must be able to hold a free-list link.
        let aligned_block_size =
            align_size(block_size, alignment).max(std::mem::size_of::<*mut u8>());

        let pool_size = aligned_block_size.checked_mul(block_count).ok_or_else(|| {
            AllocError::invalid_argument(&name, "pool size overflows usize")
        })?;
        if pool_size > MAX_CAPACITY {
            return Err(AllocError::invalid_argument(
                &name,
                "requested pool size exceeds maximum capacity (64 MiB)",
            ));
        }

        let mut allocator = Self {
            block_size: aligned_block_size,
            block_count,
            alignment,
            pool_size,
            pools: Vec::new(),
            owns_memory: false,
            config,
            stats: StatsTracker::default(),
            name,
        };
        allocator.append_pool();
        Ok(allocator)
    }

    /// Creates a pool allocator with default configuration.
    pub fn new(block_size: usize, block_count: usize) -> AllocResult<Self> {
        Self::with_config(block_size, block_count, PoolConfig::default())
    }

    /// Effective size of each block.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Block alignment.
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Blocks per pool.
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Number of pools currently owned.
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Total bytes currently owned across all pools.
    pub fn capacity(&self) -> usize {
        self.pool_size * self.pools.len()
    }

    /// Number of free blocks across all pools.
    pub fn free_blocks(&self) -> usize {
        self.pools.iter().map(|pool| pool.free_count).sum()
    }

    /// Statistics snapshot, if tracking is enabled.
    pub fn stats(&self) -> Option<AllocatorStats> {
        self.config
            .track_stats
            .then(|| self.stats.snapshot(self.allocated_size()))
    }

    /// Appends a fresh pool without capacity checks. Used for the first
    /// pool and for reacquisition after `release`, both of which were
    /// validated at construction.
    fn append_pool(&mut self) {
        self.pools.push(Pool::new(self.pool_size, self.block_size, self.block_count, self.alignment));
        self.owns_memory = true;
    }

    /// Grows by one pool, enforcing the capacity caps.
    fn allocate_new_pool(&mut self) -> AllocResult<()> {
        if self.owns_memory && capacity_checks_enabled() {
            if self.pool_size.saturating_mul(self.pools.len() + 1) > MAX_CAPACITY {
                return Err(AllocError::capacity_exceeded(
                    &self.name,
                    "exceeds maximum capacity (64 MiB)",
                ));
            }
            if let Some(max_pools) = self.config.max_pools {
                if self.pools.len() + 1 > max_pools {
                    return Err(AllocError::capacity_exceeded(
                        &self.name,
                        format!("exceeds maximum pool count: {max_pools}"),
                    ));
                }
            }
        }

        self.append_pool();
        debug!(
            allocator = %self.name,
            pools = self.pools.len(),
            pool_size = self.pool_size,
            "appended pool"
        );
        Ok(())
    }

    /// Pops the head of the first non-empty free list.
    fn pop_free_block(&mut self) -> Option<NonNull<u8>> {
        let pool = self.pools.iter_mut().find(|pool| !pool.free_list_head.is_null())?;
        let block = pool.free_list_head;
        // SAFETY: block heads this pool's free list, so it holds a link
        // written by thread_free_list or deallocate.
        pool.free_list_head = unsafe { read_link(block) };
        pool.allocated_count += 1;
        pool.free_count -= 1;
        NonNull::new(block)
    }
}

impl Allocator for PoolAllocator {
    fn allocate_aligned(
        &mut self,
        size: usize,
        _alignment: Option<usize>,
    ) -> AllocResult<NonNull<u8>> {
        // The alignment argument exists for interface compatibility; blocks
        // have the fixed alignment chosen at construction.
        if size == 0 {
            return Err(AllocError::invalid_argument(
                &self.name,
                "allocation size must be greater than zero",
            ));
        }
        if size > self.block_size {
            return Err(AllocError::capacity_exceeded(
                &self.name,
                format!("requested size {size} exceeds block size {}", self.block_size),
            ));
        }
        if !self.owns_memory {
            return Err(AllocError::released(&self.name));
        }

        loop {
            if let Some(block) = self.pop_free_block() {
                if self.config.track_stats {
                    let current = self.allocated_size();
                    self.stats.record_alloc(current);
                }
                return Ok(block);
            }
            self.allocate_new_pool()?;
        }
    }

    fn deallocate(&mut self, ptr: NonNull<u8>) -> AllocResult<()> {
        if !self.owns_memory {
            return Err(AllocError::released(&self.name));
        }

        let addr = ptr.as_ptr() as usize;
        let index = self
            .pools
            .iter()
            .position(|pool| pool.region.contains(addr))
            .ok_or_else(|| {
                AllocError::invalid_argument(
                    &self.name,
                    "pointer does not belong to any pool owned by this allocator",
                )
            })?;

        let offset = addr - self.pools[index].region.base_addr();
        if offset % self.block_size != 0 {
            return Err(AllocError::invalid_argument(
                &self.name,
                "pointer is inside pool memory but does not point to the start of a block",
            ));
        }

        if debug_checks_enabled() {
            // O(free_count), invaluable during development; benchmarks opt
            // out via the debug-checks flag.
            let mut walk = self.pools[index].free_list_head;
            while !walk.is_null() {
                if walk == ptr.as_ptr() {
                    return Err(AllocError::invalid_argument(&self.name, "double free detected"));
                }
                // SAFETY: walk traverses this pool's free list.
                walk = unsafe { read_link(walk) };
            }

            if let Some(pattern) = self.config.dealloc_pattern {
                // SAFETY: the block spans block_size bytes inside the pool
                // and is being returned, so its bytes are ours to poison.
                unsafe {
                    std::ptr::write_bytes(ptr.as_ptr(), pattern, self.block_size);
                }
            }
        }

        let pool = &mut self.pools[index];
        // SAFETY: the block starts on a block boundary inside this pool and
        // is at least pointer-sized; its bytes become the free-list link.
        unsafe {
            write_link(ptr.as_ptr(), pool.free_list_head);
        }
        pool.free_list_head = ptr.as_ptr();
        pool.allocated_count -= 1;
        pool.free_count += 1;

        if self.config.track_stats {
            self.stats.record_dealloc();
        }
        Ok(())
    }

    fn reset(&mut self) {
        if self.owns_memory {
            self.pools.truncate(1);
            let (block_size, block_count) = (self.block_size, self.block_count);
            if let Some(pool) = self.pools.first_mut() {
                pool.thread_free_list(block_size, block_count);
            }
        } else {
            self.append_pool();
        }
        self.stats.reset();
        debug!(allocator = %self.name, "reset");
    }

    fn release(&mut self) {
        self.pools.clear();
        self.owns_memory = false;
        debug!(allocator = %self.name, "released all pools");
    }

    fn allocated_size(&self) -> usize {
        self.pools.iter().map(|pool| pool.allocated_count * self.block_size).sum()
    }

    fn object_size(&self) -> Option<usize> {
        Some(self.block_size)
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for PoolAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolAllocator")
            .field("name", &self.name)
            .field("block_size", &self.block_size)
            .field("block_count", &self.block_count)
            .field("pools", &self.pools.len())
            .field("owns_memory", &self.owns_memory)
            .finish()
    }
}
