/*!
 * Memory Chunk
 * One contiguous buffer carved into fixed-size blocks
 */

use crate::core::types::{Address, BlockIndex, Size, MAX_BLOCKS_PER_CHUNK, MAX_BLOCK_ALIGN};
use crate::memory::types::{MemoryError, MemoryResult};
use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Free-block bitmap, one bit per block
type FreeMap = [u64; 4];

/// A chunk of at most 255 equally sized blocks
///
/// Free blocks are tracked as an explicit stack of block indices rather than
/// a list threaded through the free blocks' own bytes, so the chunk never
/// reads or writes memory it has handed out. A bitmap mirrors the stack to
/// reject double frees.
pub(crate) struct MemoryChunk {
    base: NonNull<u8>,
    layout: Layout,
    block_size: Size,
    capacity: usize,
    /// Indices of free blocks; the top is handed out next
    free: Vec<BlockIndex>,
    free_map: FreeMap,
}

// SAFETY: the chunk exclusively owns its buffer; the raw pointer is never shared
// outside of the blocks it hands out, whose ownership moves to the caller.
unsafe impl Send for MemoryChunk {}

impl MemoryChunk {
    /// Reserve a new chunk of `capacity` blocks of `block_size` bytes
    pub fn new(block_size: Size, capacity: usize) -> MemoryResult<Self> {
        debug_assert!(block_size > 0);
        debug_assert!(capacity > 0 && capacity <= MAX_BLOCKS_PER_CHUNK);

        let bytes = block_size
            .checked_mul(capacity)
            .ok_or(MemoryError::InvalidLayout {
                size: block_size,
                alignment: MAX_BLOCK_ALIGN,
            })?;
        let layout = Layout::from_size_align(bytes, MAX_BLOCK_ALIGN).map_err(|_| {
            MemoryError::InvalidLayout {
                size: bytes,
                alignment: MAX_BLOCK_ALIGN,
            }
        })?;

        // SAFETY: layout has a non-zero size
        let raw = unsafe { alloc::alloc(layout) };
        let base = NonNull::new(raw).ok_or(MemoryError::OutOfMemory { requested: bytes })?;

        let mut free_map = [0u64; 4];
        for index in 0..capacity {
            free_map[index / 64] |= 1u64 << (index % 64);
        }

        Ok(Self {
            base,
            layout,
            block_size,
            capacity,
            free: (0..capacity as BlockIndex).rev().collect(),
            free_map,
        })
    }

    /// Take one block, or `None` when the chunk is full
    #[inline]
    pub fn alloc(&mut self) -> Option<NonNull<u8>> {
        let index = self.free.pop()? as usize;
        self.free_map[index / 64] &= !(1u64 << (index % 64));

        // SAFETY: index < capacity, so the offset stays inside the buffer
        Some(unsafe { NonNull::new_unchecked(self.base.as_ptr().add(index * self.block_size)) })
    }

    /// Return a block previously handed out by this chunk
    pub fn dealloc(&mut self, ptr: NonNull<u8>) -> MemoryResult<()> {
        let address = ptr.as_ptr() as Address;
        if !self.contains(address) {
            return Err(MemoryError::InvalidAddress(address));
        }

        let offset = address - self.lower_bound();
        if offset % self.block_size != 0 {
            return Err(MemoryError::InvalidAddress(address));
        }

        let index = offset / self.block_size;
        let bit = 1u64 << (index % 64);
        if self.free_map[index / 64] & bit != 0 {
            return Err(MemoryError::DoubleFree(address));
        }

        self.free_map[index / 64] |= bit;
        self.free.push(index as BlockIndex);
        Ok(())
    }

    #[inline]
    pub fn blocks_available(&self) -> usize {
        self.free.len()
    }

    #[inline]
    pub fn blocks_in_use(&self) -> usize {
        self.capacity - self.free.len()
    }

    /// Every block is free; the chunk may be released
    #[inline]
    pub fn is_unused(&self) -> bool {
        self.free.len() == self.capacity
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    #[inline]
    pub fn contains(&self, address: Address) -> bool {
        address >= self.lower_bound() && address < self.upper_bound()
    }

    #[inline]
    pub fn lower_bound(&self) -> Address {
        self.base.as_ptr() as Address
    }

    #[inline]
    pub fn upper_bound(&self) -> Address {
        self.lower_bound() + self.layout.size()
    }

    #[inline]
    pub fn reserved_bytes(&self) -> Size {
        self.layout.size()
    }
}

impl Drop for MemoryChunk {
    fn drop(&mut self) {
        // SAFETY: base was allocated in `new` with exactly this layout
        unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) };
    }
}
