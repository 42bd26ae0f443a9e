/*!
 * Copy-on-Write Handles
 * Share handles until first mutation
 */

use super::hierarchy::ObjectHandle;
use super::object::Handle;
use crate::core::guard::WriteGuard;
use crate::refcount::{RefCounted, SharedPtr};
use tracing::trace;

/// Copy-on-write operations on handle pointers
///
/// # Performance
///
/// - **share**: reference-count increment while the handle is shareable
/// - **first edit of a shared handle**: one read-locked copy of the value
///
/// # Example
///
/// ```rust
/// use handle_kernel::handle::Handle;
///
/// let original = Handle::create(vec![1, 2, 3]);
/// let mut copy = original.share();
/// assert!(handle_kernel::refcount::SharedPtr::ptr_eq(&original, &copy));
///
/// // First write detaches the copy
/// copy.edit_unique().push(4);
/// assert_eq!(original.begin_read().len(), 3);
/// assert_eq!(copy.begin_read().len(), 4);
/// ```
impl<T: Clone + 'static> SharedPtr<Handle<T>> {
    /// Alias the handle, or deep-copy it when it was marked unshareable
    pub fn share(&self) -> Self {
        if self.is_shareable() {
            self.clone()
        } else {
            self.clone_handle()
        }
    }

    /// Replace a handle that has other owners with a private copy
    ///
    /// Returns whether a copy was made.
    pub fn clone_if_shared(&mut self) -> bool {
        if !self.is_shared() {
            return false;
        }
        let copy = self.clone_handle();
        trace!(
            owners = self.ref_count(),
            "Detached shared handle before edit"
        );
        *self = copy;
        true
    }

    /// Exclusive access to a handle nobody else owns
    pub fn edit_unique(&mut self) -> WriteGuard<'_, T> {
        self.clone_if_shared();
        self.begin_edit()
    }
}

/// Clone the object behind a base-level handle pointer
///
/// Suitable for mapping over collections of handles.
pub fn clone_shared<B: ?Sized + 'static>(
    handle: &SharedPtr<dyn ObjectHandle<B>>,
) -> SharedPtr<dyn ObjectHandle<B>> {
    handle.clone_handle()
}
