//! Tests of the common allocator contract across all three disciplines.

use carve_alloc::allocator::{
    Allocator, BuddyAllocator, PoolAllocator, StackAllocator, StackConfig,
};

fn allocators() -> Vec<Box<dyn Allocator>> {
    vec![
        Box::new(PoolAllocator::new(4096, 64).expect("failed to create pool allocator")),
        Box::new(
            StackAllocator::with_config(64 * 1024, StackConfig::default().resizable())
                .expect("failed to create stack allocator"),
        ),
        Box::new(BuddyAllocator::new(1024 * 1024).expect("failed to create buddy allocator")),
    ]
}

#[test]
fn test_pointers_are_valid_and_disjoint() {
    for mut allocator in allocators() {
        let mut ranges = Vec::new();
        for _ in 0..8 {
            let ptr = allocator.allocate(1024).expect("allocation failed");
            assert_eq!(ptr.as_ptr() as usize % 8, 0);

            // The block accepts writes over its full requested size.
            unsafe { std::ptr::write_bytes(ptr.as_ptr(), 0xAB, 1024) };
            ranges.push((ptr, ptr.as_ptr() as usize));
        }

        for (i, &(_, start_a)) in ranges.iter().enumerate() {
            for &(_, start_b) in &ranges[i + 1..] {
                assert!(
                    start_a + 1024 <= start_b || start_b + 1024 <= start_a,
                    "{}: live allocations overlap",
                    allocator.name()
                );
            }
        }

        // Everything written is still intact once all blocks exist.
        for &(ptr, _) in &ranges {
            let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), 1024) };
            assert!(bytes.iter().all(|&b| b == 0xAB));
        }

        for (ptr, _) in ranges.into_iter().rev() {
            allocator.deallocate(ptr).expect("deallocation failed");
        }
        assert_eq!(allocator.allocated_size(), 0);
    }
}

#[test]
fn test_release_is_idempotent_and_reset_revives() {
    for mut allocator in allocators() {
        let _ = allocator.allocate(1024).expect("allocation failed");

        allocator.release();
        assert!(allocator.allocate(1024).expect_err("allocate after release").is_released());
        let mut probe = 0u8;
        let dangling = std::ptr::NonNull::from(&mut probe);
        assert!(allocator.deallocate(dangling).expect_err("deallocate after release").is_released());

        // A second release is harmless.
        allocator.release();

        allocator.reset();
        assert_eq!(allocator.allocated_size(), 0);
        let a = allocator.allocate(1024).expect("allocation after reset failed");
        let b = allocator.allocate(1024).expect("allocation after reset failed");
        let (a_addr, b_addr) = (a.as_ptr() as usize, b.as_ptr() as usize);
        assert!(a_addr + 1024 <= b_addr || b_addr + 1024 <= a_addr);
    }
}

#[test]
fn test_reset_invalidates_and_reuses_region() {
    for mut allocator in allocators() {
        let first = allocator.allocate(1024).expect("allocation failed");
        let first_addr = first.as_ptr() as usize;

        allocator.reset();
        assert_eq!(allocator.allocated_size(), 0);

        // The retained region is reused: the first allocation after reset
        // lands where the very first one did.
        let again = allocator.allocate(1024).expect("allocation failed");
        assert_eq!(again.as_ptr() as usize, first_addr, "{}", allocator.name());
    }
}

#[test]
fn test_accounting_matches_effective_sizes() {
    // Pool counts whole blocks.
    let mut pool = PoolAllocator::new(4096, 8).expect("failed to create pool allocator");
    let p = pool.allocate(100).expect("allocation failed");
    assert_eq!(pool.allocated_size(), 4096);
    pool.deallocate(p).expect("deallocation failed");

    // Stack counts aligned request sizes.
    let mut stack = StackAllocator::new(4096).expect("failed to create stack allocator");
    let p = stack.allocate(100).expect("allocation failed");
    assert_eq!(stack.allocated_size(), 104);
    stack.deallocate(p).expect("deallocation failed");

    // Buddy counts power-of-two block sizes.
    let mut buddy = BuddyAllocator::new(1024 * 1024).expect("failed to create buddy allocator");
    let p = buddy.allocate(100).expect("allocation failed");
    assert_eq!(buddy.allocated_size(), 1024);
    buddy.deallocate(p).expect("deallocation failed");
}

#[test]
fn test_names_appear_in_errors() {
    for mut allocator in allocators() {
        allocator.set_name("frame_arena");
        allocator.release();

        let err = allocator.allocate(64).expect_err("allocate after release");
        assert_eq!(err.allocator(), "frame_arena");
        assert!(err.to_string().contains("frame_arena"));
    }
}

#[test]
fn test_zero_size_allocation_policy() {
    // Pool and stack reject zero-size requests outright.
    let mut pool = PoolAllocator::new(32, 8).expect("failed to create pool allocator");
    assert!(pool.allocate(0).expect_err("zero-size pool request").is_invalid_argument());

    let mut stack = StackAllocator::new(64).expect("failed to create stack allocator");
    assert!(stack.allocate(0).expect_err("zero-size stack request").is_invalid_argument());

    // Buddy floors every request to its minimum block.
    let mut buddy = BuddyAllocator::new(4096).expect("failed to create buddy allocator");
    let ptr = buddy.allocate(0).expect("floored allocation failed");
    assert_eq!(buddy.allocated_size(), 1024);
    buddy.deallocate(ptr).expect("deallocation failed");
}
