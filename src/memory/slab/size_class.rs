/*!
 * Size-Class Allocator
 * All chunks serving one fixed block size
 */

use super::chunk::MemoryChunk;
use crate::core::types::{Address, Size};
use crate::memory::types::{MemoryError, MemoryResult, SizeClassStats};
use std::collections::{BTreeMap, BTreeSet};
use std::ptr::NonNull;
use tracing::debug;

/// Allocator for blocks of exactly `block_size` bytes
///
/// # Performance
///
/// - **Alloc hit**: O(1) through the last-allocated chunk cache
/// - **Alloc miss**: O(log n) over chunks with free capacity
/// - **Dealloc**: O(1) through the last-deallocated cache, O(log n) otherwise
///
/// At most one completely unused chunk is retained as a reserve; a second
/// chunk that drains is handed back to the heap right away.
pub(crate) struct SizeClassAllocator {
    block_size: Size,
    blocks_per_chunk: usize,
    chunks: Vec<MemoryChunk>,
    /// Chunk base address -> index into `chunks`
    by_address: BTreeMap<Address, usize>,
    /// Indices of chunks that still have free blocks
    available: BTreeSet<usize>,
    last_alloc: Option<usize>,
    last_dealloc: Option<usize>,
    /// The unused chunk kept as reserve
    reserve: Option<usize>,
    /// Blocks handed out over the allocator's lifetime
    allocations: u64,
}

impl SizeClassAllocator {
    pub fn new(block_size: Size, blocks_per_chunk: usize) -> Self {
        Self {
            block_size,
            blocks_per_chunk,
            chunks: Vec::new(),
            by_address: BTreeMap::new(),
            available: BTreeSet::new(),
            last_alloc: None,
            last_dealloc: None,
            reserve: None,
            allocations: 0,
        }
    }

    #[inline]
    pub fn block_size(&self) -> Size {
        self.block_size
    }

    /// Take one block, growing by a chunk when every chunk is full
    pub fn alloc(&mut self) -> MemoryResult<NonNull<u8>> {
        let cached = self
            .last_alloc
            .filter(|&index| !self.chunks[index].is_full());

        let index = match cached {
            Some(index) => index,
            None => match self.available.iter().next().copied() {
                Some(index) => index,
                None => self.grow()?,
            },
        };

        self.last_alloc = Some(index);
        if self.reserve == Some(index) {
            self.reserve = None;
        }

        let chunk = &mut self.chunks[index];
        let ptr = chunk.alloc().ok_or(MemoryError::OutOfMemory {
            requested: self.block_size,
        })?;
        if chunk.is_full() {
            self.available.remove(&index);
        }

        self.allocations += 1;
        Ok(ptr)
    }

    /// Return a block; yields `true` when its chunk was released as a result
    pub fn dealloc(&mut self, ptr: NonNull<u8>) -> MemoryResult<bool> {
        let address = ptr.as_ptr() as Address;

        let cached = self
            .last_dealloc
            .filter(|&index| self.chunks[index].contains(address));
        let index = match cached {
            Some(index) => index,
            None => self
                .find_owner(address)
                .ok_or(MemoryError::InvalidAddress(address))?,
        };

        self.chunks[index].dealloc(ptr)?;
        self.available.insert(index);
        self.last_dealloc = Some(index);

        if !self.chunks[index].is_unused() {
            return Ok(false);
        }

        match self.reserve {
            Some(reserve) if reserve != index => {
                self.release_chunk(index);
                Ok(true)
            }
            _ => {
                self.reserve = Some(index);
                Ok(false)
            }
        }
    }

    /// Whether `address` lies inside one of this class's chunks
    pub fn owns(&self, address: Address) -> bool {
        self.find_owner(address).is_some()
    }

    /// Release every unused chunk, the reserve included
    pub fn trim(&mut self) -> usize {
        let mut released = 0;
        for index in (0..self.chunks.len()).rev() {
            if self.chunks[index].is_unused() {
                self.release_chunk(index);
                released += 1;
            }
        }
        released
    }

    pub fn stats(&self) -> SizeClassStats {
        SizeClassStats {
            block_size: self.block_size,
            chunk_count: self.chunks.len(),
            live_blocks: self.chunks.iter().map(MemoryChunk::blocks_in_use).sum(),
            free_blocks: self.chunks.iter().map(MemoryChunk::blocks_available).sum(),
        }
    }

    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn reserved_bytes(&self) -> Size {
        self.chunks.iter().map(MemoryChunk::reserved_bytes).sum()
    }

    fn find_owner(&self, address: Address) -> Option<usize> {
        self.by_address
            .range(..=address)
            .next_back()
            .map(|(_, &index)| index)
            .filter(|&index| self.chunks[index].contains(address))
    }

    fn grow(&mut self) -> MemoryResult<usize> {
        let chunk = MemoryChunk::new(self.block_size, self.blocks_per_chunk)?;
        let index = self.chunks.len();

        self.by_address.insert(chunk.lower_bound(), index);
        self.available.insert(index);
        self.chunks.push(chunk);

        debug!(
            block_size = self.block_size,
            chunks = self.chunks.len(),
            "Size class grew by one chunk"
        );
        Ok(index)
    }

    /// Drop the chunk at `index`, fixing every index that pointed at the
    /// chunk `swap_remove` moves into its slot
    fn release_chunk(&mut self, index: usize) {
        let last = self.chunks.len() - 1;
        let chunk = self.chunks.swap_remove(index);

        self.by_address.remove(&chunk.lower_bound());
        self.available.remove(&index);
        for slot in [&mut self.last_alloc, &mut self.last_dealloc, &mut self.reserve] {
            if *slot == Some(index) {
                *slot = None;
            }
        }

        if index != last {
            self.by_address.insert(self.chunks[index].lower_bound(), index);
            if self.available.remove(&last) {
                self.available.insert(index);
            }
            for slot in [&mut self.last_alloc, &mut self.last_dealloc, &mut self.reserve] {
                if *slot == Some(last) {
                    *slot = Some(index);
                }
            }
        }

        debug!(
            block_size = self.block_size,
            chunks = self.chunks.len(),
            "Released unused chunk"
        );
    }
}
