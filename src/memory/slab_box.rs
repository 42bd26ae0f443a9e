/*!
 * Slab Box
 * Uniquely owned value stored in a slab block
 */

use super::slab;
use super::types::MemoryResult;
use std::alloc::Layout;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use tracing::error;

/// Owning pointer to a value allocated through the global slab allocator
///
/// Behaves like `Box<T>`; small values land in a size-class chunk, large or
/// over-aligned ones on the heap. Zero-sized values never allocate.
pub struct SlabBox<T: ?Sized> {
    ptr: NonNull<T>,
    _owns: PhantomData<T>,
}

// SAFETY: SlabBox owns its value exactly like Box does
unsafe impl<T: ?Sized + Send> Send for SlabBox<T> {}
unsafe impl<T: ?Sized + Sync> Sync for SlabBox<T> {}

impl<T> SlabBox<T> {
    /// Move `value` into a slab block, aborting through
    /// [`handle_alloc_error`](std::alloc::handle_alloc_error) when memory runs out
    #[track_caller]
    pub fn new(value: T) -> Self {
        let layout = Layout::new::<T>();
        match allocate_block(layout) {
            Ok(block) => Self::write(block, value),
            Err(_) => std::alloc::handle_alloc_error(layout),
        }
    }

    /// Move `value` into a slab block
    #[track_caller]
    pub fn try_new(value: T) -> MemoryResult<Self> {
        let block = allocate_block(Layout::new::<T>())?;
        Ok(Self::write(block, value))
    }

    fn write(block: NonNull<u8>, value: T) -> Self {
        let ptr = block.cast::<T>();
        // SAFETY: the block is sized and aligned for T and not aliased
        unsafe { ptr.as_ptr().write(value) };
        Self {
            ptr,
            _owns: PhantomData,
        }
    }

    /// Move the value back out, freeing its block
    pub fn into_inner(boxed: Self) -> T {
        let ptr = Self::into_raw(boxed);
        // SAFETY: we own the value; the block is freed without dropping it again
        unsafe {
            let value = ptr.as_ptr().read();
            release_block(ptr.cast(), Layout::new::<T>());
            value
        }
    }
}

impl<T: ?Sized> SlabBox<T> {
    /// Give up ownership without dropping the value
    pub fn into_raw(boxed: Self) -> NonNull<T> {
        let ptr = boxed.ptr;
        std::mem::forget(boxed);
        ptr
    }

    /// Reclaim ownership of a pointer from [`into_raw`](Self::into_raw)
    ///
    /// # Safety
    ///
    /// `ptr` must come from `into_raw` (possibly after an unsizing cast) and
    /// must not be reclaimed twice.
    pub unsafe fn from_raw(ptr: NonNull<T>) -> Self {
        Self {
            ptr,
            _owns: PhantomData,
        }
    }

    pub fn as_ptr(boxed: &Self) -> NonNull<T> {
        boxed.ptr
    }
}

impl<T: ?Sized> Drop for SlabBox<T> {
    fn drop(&mut self) {
        // SAFETY: the value is live and owned; layout is taken before dropping
        unsafe {
            let layout = Layout::for_value(self.ptr.as_ref());
            std::ptr::drop_in_place(self.ptr.as_ptr());
            release_block(self.ptr.cast(), layout);
        }
    }
}

impl<T: ?Sized> Deref for SlabBox<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the pointer is valid for as long as the box lives
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: ?Sized> DerefMut for SlabBox<T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: unique ownership
        unsafe { self.ptr.as_mut() }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for SlabBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

/// Allocate a block for `layout`, handing out a dangling pointer for ZSTs
#[track_caller]
pub(crate) fn allocate_block(layout: Layout) -> MemoryResult<NonNull<u8>> {
    if layout.size() == 0 {
        // Dangling but aligned for the requested type
        return Ok(unsafe { NonNull::new_unchecked(layout.align() as *mut u8) });
    }
    slab::global().allocate(layout)
}

/// Return a block from [`allocate_block`]; failures are logged, not raised
///
/// # Safety
///
/// Same contract as [`SlabAllocator::deallocate`](slab::SlabAllocator::deallocate).
pub(crate) unsafe fn release_block(ptr: NonNull<u8>, layout: Layout) {
    if layout.size() == 0 {
        return;
    }
    if let Err(e) = slab::global().deallocate(ptr, layout) {
        error!(
            address = ptr.as_ptr() as usize,
            size = layout.size(),
            error = %e,
            "Failed to release slab block"
        );
    }
}
