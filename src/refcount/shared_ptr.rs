/*!
 * Shared Pointer
 * Owning pointer to an intrusively counted object
 */

use super::traits::{remove_ref, RefCounted};
use crate::memory::{MemoryResult, SlabBox};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::NonNull;

/// Owner of one reference to a [`RefCounted`] object
///
/// Cloning takes another reference, dropping releases one; the object is
/// destroyed with the last. A `SharedPtr` is never null: use
/// `Option<SharedPtr<T>>` where "no object" is a valid state.
///
/// Equality, ordering and hashing compare object identity, not contents.
///
/// # Performance
///
/// - **Clone/drop**: one uncontended mutex acquisition on the object's header
/// - **Deref**: free
pub struct SharedPtr<T: ?Sized + RefCounted> {
    ptr: NonNull<T>,
    _owns: PhantomData<T>,
}

// SAFETY: like Arc, sending or sharing the pointer shares the object
unsafe impl<T: ?Sized + RefCounted + Send + Sync> Send for SharedPtr<T> {}
unsafe impl<T: ?Sized + RefCounted + Send + Sync> Sync for SharedPtr<T> {}

impl<T: RefCounted> SharedPtr<T> {
    /// Move `value` into a slab block and take the first reference
    #[track_caller]
    pub fn new(value: T) -> Self {
        Self::adopt(SlabBox::new(value))
    }

    /// Fallible [`new`](Self::new)
    #[track_caller]
    pub fn try_new(value: T) -> MemoryResult<Self> {
        Ok(Self::adopt(SlabBox::try_new(value)?))
    }

    fn adopt(boxed: SlabBox<T>) -> Self {
        let ptr = SlabBox::into_raw(boxed);
        // SAFETY: freshly allocated and live
        let count = unsafe { ptr.as_ref() }.rc_header().add_ref();
        debug_assert_eq!(count, 1, "new object already had owners");
        Self {
            ptr,
            _owns: PhantomData,
        }
    }

    /// Erase the concrete type
    pub fn into_dyn(this: Self) -> SharedPtr<dyn RefCounted> {
        // SAFETY: unsizing keeps the same object
        unsafe { SharedPtr::cast_with(this, |ptr| -> NonNull<dyn RefCounted> { ptr }) }
    }

    /// Mutable access when this is the only reference
    pub fn get_mut(this: &mut Self) -> Option<&mut T> {
        if this.rc_header().ref_count() == 1 {
            // SAFETY: sole owner, and `this` is borrowed mutably
            Some(unsafe { this.ptr.as_mut() })
        } else {
            None
        }
    }

    /// Mutable access, first replacing a shared object with a private copy
    pub fn make_mut(this: &mut Self) -> &mut T
    where
        T: Clone,
    {
        if this.rc_header().ref_count() != 1 {
            *this = SharedPtr::new((**this).clone());
        }
        // SAFETY: sole owner now, and `this` is borrowed mutably
        unsafe { this.ptr.as_mut() }
    }
}

impl<T: ?Sized + RefCounted> SharedPtr<T> {
    /// Take a new reference on the object behind a raw pointer
    ///
    /// A null pointer yields `None`.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must point to a live object created by
    /// [`SharedPtr::new`] that stays alive for the duration of this call.
    pub unsafe fn from_raw(ptr: *const T) -> Option<Self> {
        let ptr = NonNull::new(ptr as *mut T)?;
        ptr.as_ref().rc_header().add_ref();
        Some(Self {
            ptr,
            _owns: PhantomData,
        })
    }

    /// Give up this reference without releasing it
    ///
    /// Balance with [`from_raw_owned`](Self::from_raw_owned) or
    /// [`remove_ref`](super::remove_ref).
    pub fn into_raw(this: Self) -> NonNull<T> {
        let ptr = this.ptr;
        std::mem::forget(this);
        ptr
    }

    /// Reclaim a reference given up by [`into_raw`](Self::into_raw)
    ///
    /// # Safety
    ///
    /// `ptr` must come from `into_raw` and be reclaimed at most once.
    pub unsafe fn from_raw_owned(ptr: NonNull<T>) -> Self {
        Self {
            ptr,
            _owns: PhantomData,
        }
    }

    /// Rebuild the pointer with a different static type
    ///
    /// # Safety
    ///
    /// `f` must return a pointer to the same object.
    pub(crate) unsafe fn cast_with<U, F>(this: Self, f: F) -> SharedPtr<U>
    where
        U: ?Sized + RefCounted,
        F: FnOnce(NonNull<T>) -> NonNull<U>,
    {
        SharedPtr {
            ptr: f(Self::into_raw(this)),
            _owns: PhantomData,
        }
    }

    #[inline]
    pub fn get(this: &Self) -> &T {
        this
    }

    #[inline]
    pub fn as_ptr(this: &Self) -> *const T {
        this.ptr.as_ptr()
    }

    /// Address of the object, without metadata
    #[inline]
    pub fn addr(this: &Self) -> usize {
        this.ptr.as_ptr() as *const () as usize
    }

    /// Whether both point at the same object
    #[inline]
    pub fn ptr_eq<U: ?Sized + RefCounted>(this: &Self, other: &SharedPtr<U>) -> bool {
        Self::addr(this) == SharedPtr::addr(other)
    }

    /// Point at `other`'s object; assigning a pointer to itself does nothing
    pub fn assign(this: &mut Self, other: &Self) {
        if !Self::ptr_eq(this, other) {
            *this = other.clone();
        }
    }

    /// Release this reference now
    pub fn reset(this: Self) {
        drop(this);
    }

    /// Whether the object's concrete type is `U`
    pub fn is_shared_ptr_of<U: RefCounted>(this: &Self) -> bool {
        (**this).as_any().is::<U>()
    }

    /// Recover the concrete type, or get the pointer back on mismatch
    pub fn downcast<U: RefCounted>(this: Self) -> Result<SharedPtr<U>, Self> {
        if Self::is_shared_ptr_of::<U>(&this) {
            // SAFETY: the concrete type was just checked
            Ok(unsafe { SharedPtr::cast_with(this, NonNull::cast::<U>) })
        } else {
            Err(this)
        }
    }

    /// Recover the concrete type without a release-build check
    ///
    /// # Safety
    ///
    /// The object's concrete type must be `U`.
    pub unsafe fn downcast_unchecked<U: RefCounted>(this: Self) -> SharedPtr<U> {
        debug_assert!(
            Self::is_shared_ptr_of::<U>(&this),
            "downcast_unchecked to the wrong type"
        );
        SharedPtr::cast_with(this, NonNull::cast::<U>)
    }
}

impl<T: ?Sized + RefCounted> Clone for SharedPtr<T> {
    fn clone(&self) -> Self {
        self.rc_header().add_ref();
        Self {
            ptr: self.ptr,
            _owns: PhantomData,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        Self::assign(self, source);
    }
}

impl<T: ?Sized + RefCounted> Drop for SharedPtr<T> {
    fn drop(&mut self) {
        // SAFETY: we own one reference to a live object
        unsafe {
            remove_ref(self.ptr);
        }
    }
}

impl<T: ?Sized + RefCounted> Deref for SharedPtr<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: the object lives at least as long as our reference
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: ?Sized + RefCounted> AsRef<T> for SharedPtr<T> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T: ?Sized + RefCounted> PartialEq for SharedPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl<T: ?Sized + RefCounted> Eq for SharedPtr<T> {}

impl<T: ?Sized + RefCounted> PartialOrd for SharedPtr<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: ?Sized + RefCounted> Ord for SharedPtr<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        Self::addr(self).cmp(&Self::addr(other))
    }
}

impl<T: ?Sized + RefCounted> Hash for SharedPtr<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Self::addr(self).hash(state);
    }
}

impl<T: ?Sized + RefCounted + fmt::Debug> fmt::Debug for SharedPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: ?Sized + RefCounted> fmt::Pointer for SharedPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&Self::as_ptr(self), f)
    }
}
