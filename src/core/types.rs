/*!
 * Core Types
 * Common types and constants used across the kernel
 */

/// Address type for memory operations
pub type Address = usize;

/// Size type for memory operations
pub type Size = usize;

/// Index of a block inside a chunk (chunks never hold more than 255 blocks)
pub type BlockIndex = u8;

/// Common result type for kernel operations
pub type KernelResult<T> = Result<T, super::errors::KernelError>;

/// Largest block size served from a size class by default
pub const DEFAULT_MAX_BLOCK_SIZE: Size = 1024;

/// Upper bound on blocks per chunk, imposed by `BlockIndex`
pub const MAX_BLOCKS_PER_CHUNK: usize = 255;

/// Strictest alignment a pooled block can honor
pub const MAX_BLOCK_ALIGN: Size = 16;

/// Natural alignment of a pooled block of `size` bytes
///
/// Blocks of one size class are laid out back to back from a
/// `MAX_BLOCK_ALIGN`-aligned base, so block `i` sits at `base + i * size`.
/// That address is always aligned to the largest power of two dividing
/// `size`, capped at `MAX_BLOCK_ALIGN`.
#[inline]
pub const fn block_align(size: Size) -> Size {
    if size == 0 {
        return MAX_BLOCK_ALIGN;
    }
    let natural = 1usize << size.trailing_zeros();
    if natural > MAX_BLOCK_ALIGN {
        MAX_BLOCK_ALIGN
    } else {
        natural
    }
}
