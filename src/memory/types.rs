/*!
 * Memory Types
 * Common types for slab allocation
 */

use crate::core::types::{Address, Size};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Memory operation result
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Memory errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum MemoryError {
    #[error("Out of memory: requested {requested} bytes")]
    #[diagnostic(
        code(memory::out_of_memory),
        help("The system heap refused the request. Free resources or trim the slab.")
    )]
    OutOfMemory { requested: Size },

    #[error("Zero-sized allocation requested")]
    #[diagnostic(code(memory::zero_sized))]
    ZeroSized,

    #[error("Invalid layout: size {size}, alignment {alignment}")]
    #[diagnostic(code(memory::invalid_layout))]
    InvalidLayout { size: Size, alignment: Size },

    #[error("Invalid memory address: 0x{0:x}")]
    #[diagnostic(
        code(memory::invalid_address),
        help("The block was not allocated by this size class. Check the size passed to dealloc.")
    )]
    InvalidAddress(Address),

    #[error("Double free detected at 0x{0:x}")]
    #[diagnostic(code(memory::double_free), help("The block was already returned."))]
    DoubleFree(Address),
}

/// Where a block was served from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockSource {
    /// A size-class chunk
    Pooled,
    /// The system heap (size above the pooled range or over-aligned)
    Heap,
}

/// Allocator statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorStats {
    pub pooled_allocations: u64,
    pub pooled_deallocations: u64,
    pub heap_allocations: u64,
    pub heap_deallocations: u64,
    /// Blocks currently handed out from chunks
    pub live_pooled_blocks: usize,
    /// Chunks currently owned across all size classes
    pub chunk_count: usize,
    /// Bytes reserved by those chunks
    pub reserved_bytes: usize,
}

impl AllocatorStats {
    /// Allocations not yet matched by a deallocation
    pub fn outstanding(&self) -> u64 {
        (self.pooled_allocations + self.heap_allocations)
            .saturating_sub(self.pooled_deallocations + self.heap_deallocations)
    }
}

/// Statistics for a single size class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeClassStats {
    pub block_size: Size,
    pub chunk_count: usize,
    pub live_blocks: usize,
    pub free_blocks: usize,
}

/// A live allocation recorded by leak tracking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub address: Address,
    pub size: Size,
    /// `file:line` of the allocating call site
    pub location: String,
}

impl std::fmt::Display for AllocationRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Source: {}, Ptr: 0x{:x} ({}) bytes.",
            self.location, self.address, self.size
        )
    }
}
