//! Integration tests for the stack allocator.

use carve_alloc::allocator::{Allocator, StackAllocator, StackConfig, StackFrame};

#[test]
fn test_basic_allocate_and_deallocate() {
    let mut stack = StackAllocator::new(4096).expect("failed to create stack allocator");
    assert_eq!(stack.capacity(), 4096);
    assert_eq!(stack.available(), 4096);

    let ptr = stack.allocate(128).expect("allocation failed");
    unsafe {
        std::ptr::write_bytes(ptr.as_ptr(), 0x55, 128);
        assert_eq!(*ptr.as_ptr(), 0x55);
    }
    assert_eq!(stack.available(), 4096 - 128);

    stack.deallocate(ptr).expect("deallocation failed");
    assert_eq!(stack.allocated_size(), 0);
}

#[test]
fn test_lifo_round_trip_reuses_address() {
    let mut stack = StackAllocator::new(256).expect("failed to create stack allocator");

    let p1 = stack.allocate(16).expect("allocation 1 failed");
    let p2 = stack.allocate(16).expect("allocation 2 failed");
    stack.deallocate(p2).expect("deallocation failed");

    let p3 = stack.allocate(16).expect("allocation 3 failed");
    assert_eq!(p3, p2);

    stack.deallocate(p3).expect("deallocation failed");
    stack.deallocate(p1).expect("deallocation failed");
    assert_eq!(stack.allocated_size(), 0);
}

#[test]
#[cfg_attr(not(debug_assertions), ignore = "LIFO order check needs debug checks")]
fn test_non_lifo_deallocation_is_rejected() {
    let mut stack = StackAllocator::new(256).expect("failed to create stack allocator");

    let p1 = stack.allocate(16).expect("allocation 1 failed");
    let _p2 = stack.allocate(16).expect("allocation 2 failed");

    let err = stack.deallocate(p1).expect_err("non-LIFO deallocation must fail");
    assert!(err.is_lifo_violation());
}

#[test]
fn test_requests_are_rounded_to_alignment() {
    let mut stack = StackAllocator::new(64).expect("failed to create stack allocator");

    // 30 rounds to 32 at the default 8-byte alignment; two of them fill
    // the buffer.
    let _a = stack.allocate(30).expect("allocation 1 failed");
    assert_eq!(stack.allocated_size(), 32);
    let _b = stack.allocate(30).expect("allocation 2 failed");
    assert_eq!(stack.allocated_size(), 64);

    let err = stack.allocate(8).expect_err("full buffer must reject");
    assert!(err.is_capacity_exceeded());
}

#[test]
fn test_per_call_alignment_override() {
    let mut stack = StackAllocator::new(4096).expect("failed to create stack allocator");

    // Each request is rounded to the per-call alignment, so the cursor
    // stays on that granularity and every pointer lands on it.
    for _ in 0..4 {
        let ptr = stack.allocate_aligned(10, Some(16)).expect("16-byte alignment failed");
        assert_eq!(ptr.as_ptr() as usize % 16, 0);
    }
    assert_eq!(stack.allocated_size(), 64);

    assert!(stack
        .allocate_aligned(10, Some(3))
        .expect_err("non-power-of-two alignment")
        .is_invalid_argument());
    assert!(stack
        .allocate_aligned(10, Some(2))
        .expect_err("alignment below minimum")
        .is_invalid_argument());
}

#[test]
fn test_construction_limits() {
    assert!(StackAllocator::new(0).expect_err("zero buffer").is_invalid_argument());
    assert!(StackAllocator::new(65 * 1024 * 1024)
        .expect_err("above 64 MiB cap")
        .is_invalid_argument());

    let config = StackConfig::default().with_alignment(5);
    assert!(StackAllocator::with_config(64, config).is_err());
}

#[test]
fn test_non_resizable_stack_does_not_grow() {
    let mut stack = StackAllocator::new(64).expect("failed to create stack allocator");

    let _a = stack.allocate(32).expect("allocation 1 failed");
    let _b = stack.allocate(32).expect("allocation 2 failed");

    let err = stack.allocate(16).expect_err("non-resizable stack must not grow");
    assert!(err.is_capacity_exceeded());

    // A single request larger than the whole buffer fails outright.
    let err = stack.allocate(128).expect_err("oversized request");
    assert!(err.is_capacity_exceeded());
}

#[test]
fn test_resizable_stack_grows_and_drains() {
    let config = StackConfig::default().resizable();
    let mut stack = StackAllocator::with_config(64, config).expect("failed to create stack");

    let _a = stack.allocate(64).expect("allocation 1 failed");
    let b = stack.allocate(64).expect("allocation 2 grows the stack");
    assert_eq!(stack.buffer_count(), 2);
    assert_eq!(stack.allocated_size(), 128);

    // Draining the trailing buffer pops it.
    stack.deallocate(b).expect("deallocation failed");
    assert_eq!(stack.buffer_count(), 1);
    assert_eq!(stack.allocated_size(), 64);
}

#[test]
fn test_mark_and_rewind() {
    let config = StackConfig::default().with_alignment(8).resizable();
    let mut stack = StackAllocator::with_config(256, config).expect("failed to create stack");

    let _a = stack.allocate(16).expect("allocation failed");
    let _b = stack.allocate(16).expect("allocation failed");
    let mark = stack.mark();

    let _c = stack.allocate(32).expect("allocation failed");
    let _d = stack.allocate(64).expect("allocation failed");
    assert_eq!(stack.allocated_size(), 128);

    stack.rewind_to(mark).expect("rewind failed");
    assert_eq!(stack.allocated_size(), 32);

    // New allocations start at the marked cursor.
    let e = stack.allocate(16).expect("allocation failed");
    assert_eq!(stack.allocated_size(), 48);
    stack.deallocate(e).expect("deallocation failed");
}

#[test]
fn test_rewind_across_buffers() {
    let config = StackConfig::default().with_alignment(8).resizable();
    let mut stack = StackAllocator::with_config(32, config).expect("failed to create stack");

    // Fill the first buffer.
    let _a = stack.allocate(16).expect("allocation failed");
    let _b = stack.allocate(16).expect("allocation failed");
    let mark = stack.mark();

    // Each further allocation grows by one buffer.
    let _c = stack.allocate(32).expect("allocation failed");
    let _d = stack.allocate(32).expect("allocation failed");
    assert_eq!(stack.buffer_count(), 3);

    stack.rewind_to(mark).expect("rewind failed");
    assert_eq!(stack.allocated_size(), 32);
    assert_eq!(stack.buffer_count(), 1);
}

#[test]
fn test_rewind_validation() {
    let config = StackConfig::default().resizable();
    let mut stack = StackAllocator::with_config(64, config).expect("failed to create stack");

    // Mark ahead of the cursor: take a mark, rewind below it, try again.
    let p = stack.allocate(32).expect("allocation failed");
    let ahead = stack.mark();
    stack.deallocate(p).expect("deallocation failed");
    assert!(stack.rewind_to(ahead).expect_err("mark ahead of cursor").is_invalid_argument());

    // Mark referencing more buffers than currently exist.
    let _a = stack.allocate(64).expect("allocation failed");
    let _b = stack.allocate(64).expect("allocation failed");
    let wide = stack.mark();
    stack.reset();
    assert!(stack.rewind_to(wide).expect_err("mark with more buffers").is_invalid_argument());

    // No buffers remain after release.
    stack.release();
    assert!(stack.rewind_to(stack.mark()).expect_err("rewind after release").is_released());
}

#[test]
fn test_reset_keeps_one_buffer() {
    let config = StackConfig::default().resizable();
    let mut stack = StackAllocator::with_config(64, config).expect("failed to create stack");

    let first = stack.allocate(64).expect("allocation failed");
    let _second = stack.allocate(64).expect("allocation failed");
    assert_eq!(stack.buffer_count(), 2);

    stack.reset();
    assert_eq!(stack.buffer_count(), 1);
    assert_eq!(stack.allocated_size(), 0);

    // The retained buffer is reused from the start.
    let again = stack.allocate(64).expect("allocation failed");
    assert_eq!(again, first);
}

#[test]
fn test_release_then_reset_reacquires_memory() {
    let mut stack = StackAllocator::new(1200).expect("failed to create stack allocator");
    for _ in 0..15 {
        let _ = stack.allocate(16).expect("allocation failed");
    }

    stack.release();
    assert!(stack.allocate(16).expect_err("allocate after release").is_released());
    assert_eq!(stack.buffer_count(), 0);

    stack.reset();
    let ptr = stack.allocate(16).expect("allocation after reset failed");
    stack.deallocate(ptr).expect("deallocation failed");
}

#[test]
#[cfg_attr(not(debug_assertions), ignore = "allocation records need debug checks")]
fn test_object_size_reports_last_allocation() {
    let mut stack = StackAllocator::new(256).expect("failed to create stack allocator");
    assert_eq!(stack.object_size(), None);

    let _a = stack.allocate(16).expect("allocation failed");
    assert_eq!(stack.object_size(), Some(16));
    let b = stack.allocate(30).expect("allocation failed");
    assert_eq!(stack.object_size(), Some(32));

    stack.deallocate(b).expect("deallocation failed");
    assert_eq!(stack.object_size(), Some(16));
}

#[test]
fn test_stack_frame_rewinds_on_drop() {
    let config = StackConfig::default().resizable();
    let mut stack = StackAllocator::with_config(4096, config).expect("failed to create stack");

    let _outer = stack.allocate(64).expect("allocation failed");
    {
        let mut frame = StackFrame::new(&mut stack);
        let _p1 = frame.allocator().allocate(64).expect("allocation failed");
        let _p2 = frame.allocator().allocate(64).expect("allocation failed");
        assert_eq!(frame.allocator().allocated_size(), 192);
    }
    assert_eq!(stack.allocated_size(), 64);
}

#[test]
fn test_nested_stack_frames() {
    let mut stack = StackAllocator::new(4096).expect("failed to create stack allocator");

    {
        let mut outer = StackFrame::new(&mut stack);
        let _a = outer.allocator().allocate(32).expect("allocation failed");
        {
            let mut inner = StackFrame::new(outer.allocator());
            let _b = inner.allocator().allocate(32).expect("allocation failed");
            assert_eq!(inner.allocator().allocated_size(), 64);
        }
        assert_eq!(outer.allocator().allocated_size(), 32);
    }
    assert_eq!(stack.allocated_size(), 0);
}

#[test]
fn test_repeated_frame_churn() {
    let mut stack = StackAllocator::new(64 * 1024).expect("failed to create stack allocator");

    for round in 0..100 {
        let mut frame = StackFrame::new(&mut stack);
        for _ in 0..10 {
            let ptr = frame.allocator().allocate(128).expect("allocation failed");
            unsafe { std::ptr::write_bytes(ptr.as_ptr(), round as u8, 128) };
        }
        assert_eq!(frame.allocator().allocated_size(), 1280);
    }
    assert_eq!(stack.allocated_size(), 0);
}
