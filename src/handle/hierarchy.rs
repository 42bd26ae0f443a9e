/*!
 * Handle Hierarchy
 *
 * Is-a relations between domain types and base-level views of handles
 */

use super::lifecycle::HandleState;
use super::object::Handle;
use crate::core::guard::{ReadGuard, WriteGuard};
use crate::refcount::{RefCounted, SharedPtr};
use std::fmt;

/// `Self` is-a `B`: it embeds a `B` it can expose
///
/// Every type derives from itself. Use [`derives!`](crate::derives) to
/// declare further levels.
pub trait Derives<B: ?Sized> {
    fn as_base(&self) -> &B;
    fn as_base_mut(&mut self) -> &mut B;
}

impl<T: ?Sized> Derives<T> for T {
    #[inline]
    fn as_base(&self) -> &T {
        self
    }

    #[inline]
    fn as_base_mut(&mut self) -> &mut T {
        self
    }
}

/// Build a derived value from a base-level view of another object
///
/// Fields the base does not carry take their defaults.
pub trait FromBase<B: ?Sized>: Sized {
    fn from_base(base: &B) -> Self;
}

impl<T: Clone> FromBase<T> for T {
    fn from_base(base: &T) -> Self {
        base.clone()
    }
}

/// Declare that a type derives from a base reachable through a field path
///
/// ```rust
/// use handle_kernel::derives;
///
/// #[derive(Clone, Default)]
/// struct Node { name: String }
///
/// #[derive(Clone, Default)]
/// struct Group { node: Node, children: usize }
///
/// #[derive(Clone, Default)]
/// struct Transform { group: Group, scale: f32 }
///
/// derives!(Group => Node: node);
/// derives!(Transform => Group: group);
/// derives!(Transform => Node: group.node);
/// ```
#[macro_export]
macro_rules! derives {
    ($derived:ty => $base:ty : $($field:tt).+) => {
        impl $crate::handle::Derives<$base> for $derived {
            #[inline]
            fn as_base(&self) -> &$base {
                &self.$($field).+
            }

            #[inline]
            fn as_base_mut(&mut self) -> &mut $base {
                &mut self.$($field).+
            }
        }
    };
}

/// Type-erased handle seen at base level `B`
///
/// Implemented by every [`Handle<T>`] whose `T` derives from `B`, so a
/// `SharedPtr<dyn ObjectHandle<B>>` can hold a handle of any type in `B`'s
/// hierarchy. Cloning goes through the concrete type.
pub trait ObjectHandle<B: ?Sized + 'static>: RefCounted + Send + Sync {
    /// Shared access to the base-level part
    fn begin_read(&self) -> ReadGuard<'_, B>;

    /// Exclusive access to the base-level part
    fn begin_edit(&self) -> WriteGuard<'_, B>;

    /// Independent copy of the whole object, with its own lock
    fn clone_handle(&self) -> SharedPtr<dyn ObjectHandle<B>>;

    fn state(&self) -> HandleState;

    /// True only while the handle is live
    fn is_notify_allowed(&self) -> bool {
        self.state() == HandleState::Live
    }
}

impl<B: ?Sized + 'static> fmt::Debug for dyn ObjectHandle<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHandle")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<T, B> ObjectHandle<B> for Handle<T>
where
    T: Derives<B> + Clone + Send + Sync + 'static,
    B: ?Sized + 'static,
{
    fn begin_read(&self) -> ReadGuard<'_, B> {
        self.begin_read_as::<B>()
    }

    fn begin_edit(&self) -> WriteGuard<'_, B> {
        self.begin_edit_as::<B>()
    }

    fn clone_handle(&self) -> SharedPtr<dyn ObjectHandle<B>> {
        Handle::clone_handle(self).upcast::<B>()
    }

    fn state(&self) -> HandleState {
        Handle::state(self)
    }
}

impl<T: 'static> SharedPtr<Handle<T>> {
    /// View the handle at base level `B`
    pub fn upcast<B>(self) -> SharedPtr<dyn ObjectHandle<B>>
    where
        B: ?Sized + 'static,
        Handle<T>: ObjectHandle<B>,
    {
        // SAFETY: unsizing keeps the same object
        unsafe { SharedPtr::cast_with(self, |ptr| -> std::ptr::NonNull<dyn ObjectHandle<B>> { ptr }) }
    }
}

impl<B: ?Sized + 'static> SharedPtr<dyn ObjectHandle<B>> {
    /// Recover the concrete handle type
    pub fn downcast_handle<T: 'static>(self) -> Result<SharedPtr<Handle<T>>, Self> {
        SharedPtr::downcast::<Handle<T>>(self)
    }

    /// Whether the handle behind this pointer holds a `T`
    pub fn is_handle_of<T: 'static>(&self) -> bool {
        SharedPtr::is_shared_ptr_of::<Handle<T>>(self)
    }

    /// View the same handle at another base level
    ///
    /// Goes through the concrete type `T`; fails, returning the pointer, when
    /// the handle does not hold a `T`.
    pub fn cross_cast<T, C>(self) -> Result<SharedPtr<dyn ObjectHandle<C>>, Self>
    where
        T: 'static,
        C: ?Sized + 'static,
        Handle<T>: ObjectHandle<C>,
    {
        self.downcast_handle::<T>().map(|handle| handle.upcast::<C>())
    }
}
