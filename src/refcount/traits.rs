/*!
 * Reference Counting Traits
 * Intrusively counted objects and their destruction
 */

use super::header::{DestroyCallback, RcHeader};
use crate::memory::SlabBox;
use std::any::Any;
use std::fmt;
use std::ptr::NonNull;
use tracing::trace;

/// Type-erased view of any `'static` value
///
/// Implemented for every sized type; trait objects reach the concrete
/// implementation through their vtable.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Object carrying its own reference count
///
/// Implementors only expose their embedded [`RcHeader`]; ownership is
/// managed by [`SharedPtr`](super::SharedPtr).
///
/// # Example
///
/// ```rust
/// use handle_kernel::refcount::{RcHeader, RefCounted, SharedPtr};
///
/// #[derive(Clone, Default)]
/// struct Texture {
///     header: RcHeader,
///     width: u32,
/// }
///
/// impl RefCounted for Texture {
///     fn rc_header(&self) -> &RcHeader {
///         &self.header
///     }
/// }
///
/// let texture = SharedPtr::new(Texture { width: 64, ..Default::default() });
/// let alias = texture.clone();
/// assert_eq!(texture.ref_count(), 2);
/// assert_eq!(alias.width, 64);
/// ```
pub trait RefCounted: AsAny {
    fn rc_header(&self) -> &RcHeader;

    /// Runs once when the last reference is released, before destroy callbacks
    fn will_destroy(&self) {}

    #[inline]
    fn ref_count(&self) -> usize {
        self.rc_header().ref_count()
    }

    /// More than one owner
    #[inline]
    fn is_shared(&self) -> bool {
        self.rc_header().is_shared()
    }

    #[inline]
    fn is_shareable(&self) -> bool {
        self.rc_header().is_shareable()
    }

    #[inline]
    fn mark_unshareable(&self) {
        self.rc_header().mark_unshareable()
    }

    fn add_on_destroy_callback(&self, callback: DestroyCallback, context: usize) {
        self.rc_header().add_on_destroy_callback(callback, context)
    }

    fn remove_on_destroy_callback(&self, callback: DestroyCallback, context: usize) {
        self.rc_header().remove_on_destroy_callback(callback, context)
    }
}

impl fmt::Debug for dyn RefCounted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefCounted")
            .field("header", self.rc_header())
            .finish_non_exhaustive()
    }
}

/// Take an extra reference on a counted object
///
/// Pair every call with exactly one [`remove_ref`].
pub fn add_ref<T: ?Sized + RefCounted>(object: &T) -> usize {
    object.rc_header().add_ref()
}

/// Release one reference, destroying the object when it was the last
///
/// On destruction the object's `will_destroy` hook runs, then its destroy
/// callbacks in registration order, then the object is dropped and its
/// memory handed back to the slab. Returns whether the object was destroyed.
///
/// # Safety
///
/// `ptr` must point to a live object allocated by
/// [`SharedPtr::new`](super::SharedPtr::new), and the caller must own the
/// reference being released.
pub unsafe fn remove_ref<T: ?Sized + RefCounted>(ptr: NonNull<T>) -> bool {
    let object = ptr.as_ref();
    if object.rc_header().release() > 0 {
        return false;
    }

    object.will_destroy();
    let callbacks = object.rc_header().take_callbacks();
    if !callbacks.is_empty() {
        trace!(callbacks = callbacks.len(), "Running destroy callbacks");
    }
    for (callback, context) in callbacks {
        callback(object.as_any(), context);
    }

    drop(SlabBox::from_raw(ptr));
    true
}
