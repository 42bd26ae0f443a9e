/*!
 * Slab Property Tests
 * Random allocation sequences keep blocks disjoint and accounting exact
 */

use handle_kernel::memory::{SlabAllocator, SlabConfig};
use proptest::prelude::*;
use std::ptr::NonNull;

/// Either allocate `size` bytes or free the live block at `index` (modulo)
#[derive(Debug, Clone)]
enum Op {
    Alloc(usize),
    Free(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (1usize..=160).prop_map(Op::Alloc),
        2 => any::<usize>().prop_map(Op::Free),
    ]
}

fn overlaps(a: (usize, usize), b: (usize, usize)) -> bool {
    a.0 < b.0 + b.1 && b.0 < a.0 + a.1
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Live blocks never overlap, and every block is returned cleanly
    #[test]
    fn live_blocks_are_disjoint(ops in prop::collection::vec(op(), 1..200)) {
        let slab = SlabAllocator::new(SlabConfig {
            max_block_size: 128,
            blocks_per_chunk: 8,
            track_leaks: false,
        }).unwrap();
        let mut live: Vec<(NonNull<u8>, usize)> = Vec::new();

        for op in ops {
            match op {
                Op::Alloc(size) => {
                    let ptr = slab.alloc(size).unwrap();
                    let block = (ptr.as_ptr() as usize, size);
                    for (other, other_size) in &live {
                        prop_assert!(!overlaps(block, (other.as_ptr() as usize, *other_size)));
                    }
                    live.push((ptr, size));
                }
                Op::Free(index) if !live.is_empty() => {
                    let (ptr, size) = live.swap_remove(index % live.len());
                    let result = unsafe { slab.dealloc(ptr, size) };
                    prop_assert!(result.is_ok());
                }
                Op::Free(_) => {}
            }
        }

        prop_assert_eq!(slab.stats().outstanding(), live.len() as u64);
        for (ptr, size) in live {
            let result = unsafe { slab.dealloc(ptr, size) };
            prop_assert!(result.is_ok());
        }
        prop_assert_eq!(slab.stats().live_pooled_blocks, 0);
    }

    /// Pooled blocks honor the natural alignment of their size class
    #[test]
    fn pooled_blocks_are_aligned(size in 1usize..=1024) {
        let slab = SlabAllocator::new(SlabConfig::lean()).unwrap();
        let ptr = slab.alloc(size).unwrap();
        prop_assert_eq!(ptr.as_ptr() as usize % handle_kernel::core::block_align(size), 0);
        let result = unsafe { slab.dealloc(ptr, size) };
        prop_assert!(result.is_ok());
    }
}
