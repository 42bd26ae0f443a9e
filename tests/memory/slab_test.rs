/*!
 * Slab Allocator Tests
 * Size-class routing, block reuse, chunk release and concurrent use
 */

use handle_kernel::memory::{
    Allocator, BlockSource, MemoryError, MemoryInfo, SlabAllocator, SlabBox, SlabConfig,
};
use pretty_assertions::assert_eq;
use std::alloc::Layout;
use std::sync::Arc;
use std::thread;

fn small_chunks() -> SlabAllocator {
    SlabAllocator::new(SlabConfig {
        max_block_size: 64,
        blocks_per_chunk: 4,
        track_leaks: false,
    })
    .unwrap()
}

#[test]
fn test_block_is_writable_after_reuse() {
    let slab = SlabAllocator::new(SlabConfig::lean()).unwrap();

    let first = slab.alloc(64).unwrap();
    unsafe {
        first.as_ptr().write_bytes(0xAB, 64);
        slab.dealloc(first, 64).unwrap();
    }

    // Contents are unspecified after reuse; only validity is guaranteed
    let second = slab.alloc(64).unwrap();
    unsafe {
        second.as_ptr().write_bytes(0x11, 64);
        assert_eq!(*second.as_ptr().add(63), 0x11);
        slab.dealloc(second, 64).unwrap();
    }
    assert_eq!(slab.stats().outstanding(), 0);
}

#[test]
fn test_distinct_blocks_do_not_overlap() {
    let slab = SlabAllocator::new(SlabConfig::lean()).unwrap();
    let blocks: Vec<_> = (0..300).map(|_| slab.alloc(24).unwrap()).collect();

    let mut addresses: Vec<usize> = blocks.iter().map(|ptr| ptr.as_ptr() as usize).collect();
    addresses.sort_unstable();
    for pair in addresses.windows(2) {
        assert!(pair[1] - pair[0] >= 24, "blocks overlap: {:x?}", pair);
    }

    // 300 blocks need two chunks of 255
    assert_eq!(slab.size_class_stats(24).unwrap().chunk_count, 2);

    for ptr in blocks {
        unsafe { slab.dealloc(ptr, 24).unwrap() };
    }
}

#[test]
fn test_drained_chunks_beyond_reserve_are_released() {
    let slab = small_chunks();
    let blocks: Vec<_> = (0..8).map(|_| slab.alloc(32).unwrap()).collect();
    assert_eq!(slab.size_class_stats(32).unwrap().chunk_count, 2);

    for ptr in blocks {
        unsafe { slab.dealloc(ptr, 32).unwrap() };
    }

    // One empty chunk stays behind as reserve
    let stats = slab.size_class_stats(32).unwrap();
    assert_eq!(stats.chunk_count, 1);
    assert_eq!(stats.live_blocks, 0);
    assert_eq!(stats.free_blocks, 4);

    assert_eq!(slab.trim(), 1);
    assert_eq!(slab.stats().chunk_count, 0);
    assert_eq!(slab.stats().reserved_bytes, 0);
}

#[test]
fn test_reserve_chunk_is_reused() {
    let slab = small_chunks();
    let ptr = slab.alloc(16).unwrap();
    unsafe { slab.dealloc(ptr, 16).unwrap() };

    let again = slab.alloc(16).unwrap();
    assert_eq!(slab.size_class_stats(16).unwrap().chunk_count, 1);
    assert!(slab.owns(again, 16));
    unsafe { slab.dealloc(again, 16).unwrap() };
}

#[test]
fn test_large_and_overaligned_requests_use_heap() {
    let slab = small_chunks();
    let large = Layout::from_size_align(65, 1).unwrap();
    let overaligned = Layout::from_size_align(16, 64).unwrap();

    assert_eq!(slab.source_for(large), BlockSource::Heap);
    assert_eq!(slab.source_for(overaligned), BlockSource::Heap);

    let big = slab.allocate(large).unwrap();
    let aligned = slab.allocate(overaligned).unwrap();
    assert_eq!(aligned.as_ptr() as usize % 64, 0);
    assert!(!slab.owns(big, 65));

    let stats = slab.stats();
    assert_eq!(stats.heap_allocations, 2);
    assert_eq!(stats.pooled_allocations, 0);

    unsafe {
        slab.deallocate(big, large).unwrap();
        slab.deallocate(aligned, overaligned).unwrap();
    }
    assert_eq!(slab.stats().heap_deallocations, 2);
}

#[test]
fn test_foreign_pointer_is_rejected() {
    let slab = small_chunks();
    let held = slab.alloc(8).unwrap();
    let mut local = 0u64;
    let foreign = std::ptr::NonNull::from(&mut local).cast::<u8>();

    let result = unsafe { slab.dealloc(foreign, 8) };
    assert_eq!(
        result,
        Err(MemoryError::InvalidAddress(foreign.as_ptr() as usize))
    );
    unsafe { slab.dealloc(held, 8).unwrap() };
}

#[test]
fn test_allocator_through_traits() {
    let slab = small_chunks();
    let allocator: &dyn Allocator = &slab;
    let layout = Layout::new::<[u32; 4]>();

    let ptr = allocator.allocate(layout).unwrap();
    assert!(allocator.owns(ptr, layout));

    let info: &dyn MemoryInfo = &slab;
    assert_eq!(info.outstanding(), 1);

    unsafe { allocator.deallocate(ptr, layout).unwrap() };
    assert_eq!(info.outstanding(), 0);
}

#[test]
fn test_concurrent_size_classes() {
    let slab = Arc::new(SlabAllocator::new(SlabConfig::lean()).unwrap());

    let workers: Vec<_> = (1..=8usize)
        .map(|worker| {
            let slab = Arc::clone(&slab);
            thread::spawn(move || {
                let size = worker * 8;
                for round in 0..200u8 {
                    let ptr = slab.alloc(size).unwrap();
                    unsafe {
                        ptr.as_ptr().write_bytes(round, size);
                        assert_eq!(*ptr.as_ptr(), round);
                        slab.dealloc(ptr, size).unwrap();
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let stats = slab.stats();
    assert_eq!(stats.pooled_allocations, 1600);
    assert_eq!(stats.outstanding(), 0);
    assert_eq!(stats.live_pooled_blocks, 0);
}

#[test]
fn test_slab_box_uses_global_allocator() {
    let boxed = SlabBox::new([7u8; 48]);
    assert_eq!(boxed[47], 7);
    assert!(handle_kernel::memory::global().owns(SlabBox::as_ptr(&boxed).cast(), 48));

    let values = SlabBox::into_inner(boxed);
    assert_eq!(values.len(), 48);
}
