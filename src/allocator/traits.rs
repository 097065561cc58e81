//! The common allocator capability.
//!
//! All three allocators implement [`Allocator`], so code that only needs
//! "give me bytes, take them back" can hold a `&mut dyn Allocator` and stay
//! oblivious to the discipline behind it.
//!
//! # Pointer lifetime contract
//!
//! Pointers returned by [`Allocator::allocate`] are borrows of the
//! allocator's owned regions. They are invalidated by the matching
//! `deallocate`, by `reset`, by `release`, and by dropping the allocator.
//! The methods themselves are safe; dereferencing a handed-out pointer is
//! the caller's `unsafe`, and using one past its lifetime is undefined
//! behavior on the caller's side.

use std::ptr::NonNull;

use crate::error::AllocResult;

/// Abstract contract shared by the pool, stack and buddy allocators.
///
/// Allocators are single-owner values: every method takes `&mut self` and
/// no internal synchronization is performed.
pub trait Allocator {
    /// Allocates at least `size` bytes.
    ///
    /// `alignment` of `None` selects the allocator's default alignment.
    /// `Some(a)` requests alignment `a`, which must be a power of two; the
    /// pool and buddy allocators accept the argument for interface
    /// compatibility but do not honor it (their blocks have fixed natural
    /// alignment).
    fn allocate_aligned(
        &mut self,
        size: usize,
        alignment: Option<usize>,
    ) -> AllocResult<NonNull<u8>>;

    /// Allocates at least `size` bytes at the default alignment.
    fn allocate(&mut self, size: usize) -> AllocResult<NonNull<u8>> {
        self.allocate_aligned(size, None)
    }

    /// Returns a block to the allocator.
    ///
    /// `ptr` must have been returned by this allocator's `allocate` and not
    /// yet deallocated; foreign, misaligned and repeated pointers are
    /// rejected with an error.
    fn deallocate(&mut self, ptr: NonNull<u8>) -> AllocResult<()>;

    /// Returns the allocator to its initial logical state.
    ///
    /// All previously handed-out pointers become invalid. The owned
    /// region(s) are retained where possible; if [`release`](Self::release)
    /// had been called, an initial region is reacquired.
    fn reset(&mut self);

    /// Frees every owned region.
    ///
    /// Subsequent `allocate`/`deallocate` calls fail until
    /// [`reset`](Self::reset) is called.
    fn release(&mut self);

    /// Sum of the effective sizes of currently live allocations.
    fn allocated_size(&self) -> usize;

    /// Size the allocator associates with its objects, where meaningful.
    ///
    /// The pool reports its fixed block size. The stack reports the size of
    /// the most recent live allocation, and only while debug checks are
    /// enabled. The buddy allocator does not track one and returns `None`.
    fn object_size(&self) -> Option<usize>;

    /// Sets the diagnostic name carried in this allocator's errors.
    fn set_name(&mut self, name: &str);

    /// The diagnostic name carried in this allocator's errors.
    fn name(&self) -> &str;
}
