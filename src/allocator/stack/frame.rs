//! RAII-based stack frame for automatic rewind.

use super::{StackAllocator, StackMarker};

/// Scoped view of a stack allocator that rewinds on drop.
///
/// Captures a mark on construction and rewinds to it when the frame goes
/// out of scope, releasing everything allocated inside the frame on every
/// exit path.
pub struct StackFrame<'a> {
    allocator: &'a mut StackAllocator,
    marker: StackMarker,
}

impl<'a> StackFrame<'a> {
    /// Opens a frame at the allocator's current position.
    pub fn new(allocator: &'a mut StackAllocator) -> Self {
        let marker = allocator.mark();
        Self { allocator, marker }
    }

    /// The underlying allocator, for allocations inside the frame.
    pub fn allocator(&mut self) -> &mut StackAllocator {
        self.allocator
    }

    /// Rewinds now and consumes the frame.
    pub fn rewind(self) {
        // Drop performs the rewind.
        drop(self);
    }
}

impl Drop for StackFrame<'_> {
    fn drop(&mut self) {
        let _ = self.allocator.rewind_to(self.marker);
    }
}
