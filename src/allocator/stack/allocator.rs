//! Main stack allocator implementation.
//!
//! # Safety
//!
//! The allocator bump-allocates inside the last buffer of an ordered
//! buffer sequence. No intrusive bookkeeping is stored in the managed
//! bytes; all state lives in the `offset` cursors and, under debug checks,
//! in the allocation-record stack.
//!
//! ## Invariants
//!
//! - In every buffer, `offset` equals the sum of the aligned sizes of the
//!   allocations currently live in that buffer
//! - Under debug checks, the top allocation record names the most recently
//!   returned pointer; deallocating anything else is an error
//! - Only the last buffer ever has free space used for new allocations
//! - A trailing buffer that drains to `offset == 0` is dropped while more
//!   than one buffer remains

use std::ptr::NonNull;

use tracing::debug;

use super::{StackConfig, StackMarker};
use crate::allocator::{
    resolve_default_alignment, Allocator, AllocatorStats, StatsTracker, MIN_ALIGNMENT,
};
use crate::error::{AllocError, AllocResult};
use crate::flags::{capacity_checks_enabled, debug_checks_enabled};
use crate::region::Region;
use crate::utils::{align_size, is_power_of_two};

/// Hard cap on the total bytes a stack allocator may own.
pub const MAX_CAPACITY: usize = 64 * 1024 * 1024;

/// Regions are over-aligned to a cache line so that per-call alignment
/// overrides up to 64 bytes are honored at offset zero.
const REGION_ALIGNMENT: usize = 64;

/// One linear buffer with its bump cursor.
struct Buffer {
    region: Region,
    offset: usize,
}

/// Record of one live allocation, kept while debug checks are enabled.
struct AllocationRecord {
    addr: usize,
    size: usize,
}

/// Stack allocator: bump allocation, LIFO deallocation, O(1) rewind.
///
/// # Memory Layout
/// ```text
/// [base]--[alloc1]--[alloc2]--[alloc3]--[offset]----free----[end]
///          <------- allocated ------->   <---- available ---->
/// ```
///
/// Deallocations must target the most recent allocation. With debug checks
/// enabled the order is verified against the allocation-record stack; with
/// them disabled the allocation size is inferred from the distance between
/// the pointer and the cursor.
pub struct StackAllocator {
    /// Size of every buffer.
    buffer_size: usize,

    /// Default cursor alignment.
    alignment: usize,

    /// Buffers in creation order; the last one is active.
    buffers: Vec<Buffer>,

    /// Live allocations, oldest first. Maintained while debug checks are
    /// enabled.
    records: Vec<AllocationRecord>,

    /// False only after `release`.
    owns_memory: bool,

    config: StackConfig,
    stats: StatsTracker,
    name: String,
}

impl StackAllocator {
    /// Creates a stack allocator with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::InvalidArgument`] if `buffer_size` is zero or
    /// above the 64 MiB cap, or the configured alignment is invalid.
    pub fn with_config(buffer_size: usize, config: StackConfig) -> AllocResult<Self> {
        let name = "stack_allocator".to_string();

        if buffer_size == 0 {
            return Err(AllocError::invalid_argument(
                &name,
                "buffer size must be greater than zero",
            ));
        }
        if buffer_size > MAX_CAPACITY {
            return Err(AllocError::invalid_argument(
                &name,
                "requested size exceeds maximum capacity (64 MiB)",
            ));
        }

        let alignment = resolve_default_alignment(&name, config.alignment)?;

        let mut allocator = Self {
            buffer_size,
            alignment,
            buffers: Vec::new(),
            records: Vec::new(),
            owns_memory: false,
            config,
            stats: StatsTracker::default(),
            name,
        };
        allocator.append_buffer();
        Ok(allocator)
    }

    /// Creates a stack allocator with default configuration.
    pub fn new(buffer_size: usize) -> AllocResult<Self> {
        Self::with_config(buffer_size, StackConfig::default())
    }

    /// Size of each buffer.
    pub fn capacity(&self) -> usize {
        self.buffer_size
    }

    /// Number of buffers currently owned.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Bytes currently allocated across all buffers.
    pub fn used(&self) -> usize {
        self.buffers.iter().map(|buffer| buffer.offset).sum()
    }

    /// Bytes still available in the active buffer.
    pub fn available(&self) -> usize {
        self.buffers.last().map_or(0, |buffer| buffer.region.len() - buffer.offset)
    }

    /// Statistics snapshot, if tracking is enabled.
    pub fn stats(&self) -> Option<AllocatorStats> {
        self.config.track_stats.then(|| self.stats.snapshot(self.used()))
    }

    /// Captures the current position for a later [`rewind_to`].
    ///
    /// [`rewind_to`]: Self::rewind_to
    pub fn mark(&self) -> StackMarker {
        StackMarker {
            buffer_count: self.buffers.len(),
            offset: self.buffers.last().map_or(0, |buffer| buffer.offset),
            record_depth: self.records.len(),
        }
    }

    /// Rewinds to a previously captured mark, invalidating every pointer
    /// handed out after it.
    ///
    /// # Errors
    ///
    /// Fails with [`AllocError::ReleasedAllocator`] if the allocator no
    /// longer owns memory, and with [`AllocError::InvalidArgument`] if the
    /// mark references more buffers than currently exist or lies ahead of
    /// the current cursor.
    pub fn rewind_to(&mut self, marker: StackMarker) -> AllocResult<()> {
        if !self.owns_memory {
            return Err(AllocError::released(&self.name));
        }
        if marker.buffer_count == 0 {
            return Err(AllocError::invalid_argument(
                &self.name,
                "mark does not reference any buffer",
            ));
        }
        if self.buffers.len() < marker.buffer_count {
            return Err(AllocError::invalid_argument(
                &self.name,
                "allocator has fewer buffers than the mark",
            ));
        }
        if self.buffers.len() == marker.buffer_count {
            let current = self.buffers[marker.buffer_count - 1].offset;
            if current < marker.offset {
                return Err(AllocError::invalid_argument(
                    &self.name,
                    "mark is ahead of the current cursor",
                ));
            }
        }

        self.buffers.truncate(marker.buffer_count);
        if let Some(buffer) = self.buffers.last_mut() {
            buffer.offset = marker.offset;
        }
        if debug_checks_enabled() {
            self.records.truncate(marker.record_depth);
        }
        Ok(())
    }

    /// Appends a fresh buffer without capacity checks. Used for the first
    /// buffer and for reacquisition after `release`, both validated at
    /// construction.
    fn append_buffer(&mut self) {
        self.buffers
            .push(Buffer { region: Region::new(self.buffer_size, REGION_ALIGNMENT), offset: 0 });
        self.owns_memory = true;
    }

    /// Grows by one buffer, enforcing resizability and the capacity cap.
    fn allocate_new_buffer(&mut self) -> AllocResult<()> {
        if self.owns_memory {
            if !self.config.resizable {
                return Err(AllocError::capacity_exceeded(
                    &self.name,
                    "cannot allocate a new buffer in non-resizable mode",
                ));
            }
            if capacity_checks_enabled()
                && self.buffer_size.saturating_mul(self.buffers.len() + 1) > MAX_CAPACITY
            {
                return Err(AllocError::capacity_exceeded(
                    &self.name,
                    "exceeds maximum capacity (64 MiB)",
                ));
            }
        }

        self.append_buffer();
        debug!(
            allocator = %self.name,
            buffers = self.buffers.len(),
            buffer_size = self.buffer_size,
            "appended buffer"
        );
        Ok(())
    }

    /// Deallocation with the allocation-record stack: the pointer must be
    /// the most recent allocation.
    fn pop_checked(&mut self, addr: usize) -> AllocResult<usize> {
        let record = self.records.last().ok_or_else(|| {
            AllocError::lifo_violation(&self.name, "no live allocation to deallocate")
        })?;
        if record.addr != addr {
            return Err(AllocError::lifo_violation(
                &self.name,
                "pointer is not the most recent allocation",
            ));
        }
        let size = record.size;

        let buffer = self.buffers.last_mut().ok_or_else(|| {
            AllocError::internal(&self.name, "no active buffer despite owned memory")
        })?;
        if buffer.offset < size {
            return Err(AllocError::internal(
                &self.name,
                "allocation record larger than the active buffer's cursor",
            ));
        }

        if let Some(pattern) = self.config.dealloc_pattern {
            let offset_in_buffer = addr - buffer.region.base_addr();
            // SAFETY: the record names the most recent allocation inside
            // the active buffer; it is being freed, so poisoning it cannot
            // touch live data.
            unsafe {
                std::ptr::write_bytes(buffer.region.base().add(offset_in_buffer), pattern, size);
            }
        }

        buffer.offset -= size;
        self.records.pop();
        Ok(size)
    }

    /// Deallocation without records: infer the allocation size from the
    /// distance between the cursor and the pointer.
    fn pop_inferred(&mut self, addr: usize) -> AllocResult<usize> {
        let buffer = self.buffers.last_mut().ok_or_else(|| {
            AllocError::internal(&self.name, "no active buffer despite owned memory")
        })?;

        let base = buffer.region.base_addr();
        if addr < base || addr >= buffer.region.end_addr() {
            return Err(AllocError::invalid_argument(
                &self.name,
                "pointer does not belong to the active buffer",
            ));
        }

        let top = base + buffer.offset;
        if addr >= top {
            return Err(AllocError::lifo_violation(
                &self.name,
                "pointer is at or beyond the current top of stack",
            ));
        }

        let inferred = top - addr;
        buffer.offset -= inferred;
        Ok(inferred)
    }
}

impl Allocator for StackAllocator {
    fn allocate_aligned(
        &mut self,
        size: usize,
        alignment: Option<usize>,
    ) -> AllocResult<NonNull<u8>> {
        if !self.owns_memory {
            return Err(AllocError::released(&self.name));
        }
        if size == 0 {
            return Err(AllocError::invalid_argument(
                &self.name,
                "allocation size must be greater than zero",
            ));
        }

        let effective_alignment = match alignment {
            None => self.alignment,
            Some(alignment) => {
                if !is_power_of_two(alignment) {
                    return Err(AllocError::invalid_argument(
                        &self.name,
                        "alignment must be a power of two",
                    ));
                }
                if alignment < MIN_ALIGNMENT {
                    return Err(AllocError::invalid_argument(
                        &self.name,
                        format!("alignment must be at least {MIN_ALIGNMENT} bytes"),
                    ));
                }
                alignment
            }
        };

        let aligned_size = align_size(size, effective_alignment);
        if aligned_size > self.buffer_size {
            return Err(AllocError::capacity_exceeded(
                &self.name,
                format!("requested size exceeds buffer size ({} bytes)", self.buffer_size),
            ));
        }

        loop {
            let buffer = self.buffers.last_mut().ok_or_else(|| {
                AllocError::internal(&self.name, "no active buffer despite owned memory")
            })?;

            if buffer.offset + aligned_size <= buffer.region.len() {
                // SAFETY: offset + aligned_size <= region length, so the
                // returned pointer and every byte of the allocation lie
                // inside the active region.
                let ptr = unsafe { buffer.region.base().add(buffer.offset) };
                buffer.offset += aligned_size;

                if debug_checks_enabled() {
                    self.records.push(AllocationRecord { addr: ptr as usize, size: aligned_size });
                }
                if self.config.track_stats {
                    let current = self.used();
                    self.stats.record_alloc(current);
                }
                return NonNull::new(ptr).ok_or_else(|| {
                    AllocError::internal(&self.name, "region produced a null block pointer")
                });
            }

            self.allocate_new_buffer()?;
        }
    }

    fn deallocate(&mut self, ptr: NonNull<u8>) -> AllocResult<()> {
        if !self.owns_memory {
            return Err(AllocError::released(&self.name));
        }

        let addr = ptr.as_ptr() as usize;
        if debug_checks_enabled() {
            self.pop_checked(addr)?;
        } else {
            self.pop_inferred(addr)?;
        }

        // A drained trailing buffer is dropped so the previous one becomes
        // active again; the first buffer always stays.
        if self.buffers.len() > 1 && self.buffers.last().is_some_and(|buffer| buffer.offset == 0) {
            self.buffers.pop();
            debug!(allocator = %self.name, buffers = self.buffers.len(), "dropped drained buffer");
        }

        if self.config.track_stats {
            self.stats.record_dealloc();
        }
        Ok(())
    }

    fn reset(&mut self) {
        if self.owns_memory {
            self.buffers.truncate(1);
            if let Some(buffer) = self.buffers.first_mut() {
                buffer.offset = 0;
            }
        } else {
            self.append_buffer();
        }
        self.records.clear();
        self.stats.reset();
        debug!(allocator = %self.name, "reset");
    }

    fn release(&mut self) {
        self.buffers.clear();
        self.records.clear();
        self.owns_memory = false;
        debug!(allocator = %self.name, "released all buffers");
    }

    fn allocated_size(&self) -> usize {
        self.used()
    }

    fn object_size(&self) -> Option<usize> {
        if debug_checks_enabled() {
            self.records.last().map(|record| record.size)
        } else {
            None
        }
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for StackAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackAllocator")
            .field("name", &self.name)
            .field("buffer_size", &self.buffer_size)
            .field("buffers", &self.buffers.len())
            .field("used", &self.used())
            .field("owns_memory", &self.owns_memory)
            .finish()
    }
}
