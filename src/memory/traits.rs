/*!
 * Memory Traits
 * Memory management abstractions
 */

use super::types::*;
use std::alloc::Layout;
use std::ptr::NonNull;

/// Block allocator interface
pub trait Allocator: Send + Sync {
    /// Allocate a block satisfying `layout`
    fn allocate(&self, layout: Layout) -> MemoryResult<NonNull<u8>>;

    /// Return a block to the allocator
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this allocator with the
    /// same `layout` and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) -> MemoryResult<()>;

    /// Check whether the allocator pooled this block itself
    fn owns(&self, ptr: NonNull<u8>, layout: Layout) -> bool;
}

/// Memory statistics provider
pub trait MemoryInfo: Send + Sync {
    /// Get overall allocator statistics
    fn stats(&self) -> AllocatorStats;

    /// Allocations that have not been returned yet
    fn live_allocations(&self) -> Vec<AllocationRecord>;

    /// Number of outstanding allocations
    fn outstanding(&self) -> u64 {
        self.stats().outstanding()
    }
}
