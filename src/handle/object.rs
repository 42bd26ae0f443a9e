/*!
 * Object Handle
 *
 * Reference-counted, lock-guarded owner of one domain value
 */

use super::hierarchy::{Derives, FromBase, ObjectHandle};
use super::holder::Holder;
use super::lifecycle::{HandleState, Lifecycle};
use crate::core::guard::{ReadGuard, WriteGuard};
use crate::core::sync::{default_policy, LockingPolicy};
use crate::memory::{MemoryResult, SlabBox};
use crate::refcount::{RcHeader, RefCounted, SharedPtr};
use std::fmt;
use std::mem::ManuallyDrop;
use tracing::{error, trace};

/// Handle to a `T` shared through [`SharedPtr`]
///
/// All access goes through guards: any number of [`ReadGuard`]s, or a single
/// [`WriteGuard`], at a time. The value and its lock live in a slab block
/// owned by the handle.
///
/// # Example
///
/// ```rust
/// use handle_kernel::handle::Handle;
///
/// let counter = Handle::create(0u32);
/// {
///     let mut value = counter.begin_edit();
///     *value += 1;
///     value.end_edit();
/// }
///
/// let copy = counter.clone_handle();
/// *counter.begin_edit() += 1;
/// assert_eq!(*copy.begin_read(), 1);
/// assert_eq!(*counter.begin_read(), 2);
/// ```
pub struct Handle<T> {
    header: RcHeader,
    holder: ManuallyDrop<SlabBox<Holder<T>>>,
    lifecycle: Lifecycle,
}

impl<T: 'static> Handle<T> {
    /// Wrap `value` in a new handle using the default locking policy
    #[track_caller]
    pub fn create(value: T) -> SharedPtr<Self> {
        Self::create_with_policy(value, default_policy())
    }

    /// Handle to a default-constructed `T`
    #[track_caller]
    pub fn create_default() -> SharedPtr<Self>
    where
        T: Default,
    {
        Self::create(T::default())
    }

    /// Wrap `value` in a new handle whose lock uses `policy`
    #[track_caller]
    pub fn create_with_policy(value: T, policy: LockingPolicy) -> SharedPtr<Self> {
        let lifecycle = Self::constructing();
        let holder = SlabBox::new(Holder::new(value, policy));
        SharedPtr::new(Self::finish(holder, lifecycle))
    }

    /// Fallible [`create`](Self::create)
    #[track_caller]
    pub fn try_create(value: T) -> MemoryResult<SharedPtr<Self>> {
        let lifecycle = Self::constructing();
        let holder = SlabBox::try_new(Holder::new(value, default_policy()))?;
        SharedPtr::try_new(Self::finish(holder, lifecycle))
    }

    /// New handle holding a `T` built from a base-level view of `base`
    ///
    /// `base` stays read-locked while the value is built.
    #[track_caller]
    pub fn create_from_base<B, S>(base: &S) -> SharedPtr<Self>
    where
        B: ?Sized + 'static,
        S: ?Sized + ObjectHandle<B>,
        T: FromBase<B>,
    {
        let value = {
            let view = base.begin_read();
            T::from_base(&view)
        };
        Self::create(value)
    }

    fn constructing() -> Lifecycle {
        let lifecycle = Lifecycle::new();
        Self::transition(&lifecycle, HandleState::Constructing);
        lifecycle
    }

    fn finish(holder: SlabBox<Holder<T>>, lifecycle: Lifecycle) -> Self {
        Self::transition(&lifecycle, HandleState::Live);
        Self {
            header: RcHeader::new(),
            holder: ManuallyDrop::new(holder),
            lifecycle,
        }
    }

    /// Shared access; blocks while a writer holds the handle
    pub fn begin_read(&self) -> ReadGuard<'_, T> {
        self.holder.read()
    }

    /// Exclusive access; blocks until every other guard is released
    pub fn begin_edit(&self) -> WriteGuard<'_, T> {
        self.holder.write()
    }

    /// Shared access to the base-level part `B` of the value
    pub fn begin_read_as<B: ?Sized>(&self) -> ReadGuard<'_, B>
    where
        T: Derives<B>,
    {
        ReadGuard::map(self.begin_read(), |value| value.as_base())
    }

    /// Exclusive access to the base-level part `B` of the value
    pub fn begin_edit_as<B: ?Sized>(&self) -> WriteGuard<'_, B>
    where
        T: Derives<B>,
    {
        WriteGuard::map(self.begin_edit(), |value| value.as_base_mut())
    }

    /// Run `f` under a shared hold
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.begin_read())
    }

    /// Run `f` under the exclusive hold
    pub fn edit<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.begin_edit())
    }

    /// Independent handle holding a copy of the value, with its own lock
    ///
    /// The copy uses the same locking policy as this handle.
    #[track_caller]
    pub fn clone_handle(&self) -> SharedPtr<Self>
    where
        T: Clone,
    {
        let value = self.begin_read().clone();
        Self::create_with_policy(value, self.policy())
    }

    pub fn state(&self) -> HandleState {
        self.lifecycle.get()
    }

    /// True only while the handle is live
    pub fn is_notify_allowed(&self) -> bool {
        self.state() == HandleState::Live
    }

    pub fn policy(&self) -> LockingPolicy {
        self.holder.lock().policy()
    }

    pub fn is_write_locked(&self) -> bool {
        self.holder.lock().is_locked_exclusive()
    }

    pub fn reader_count(&self) -> usize {
        self.holder.lock().shared_count()
    }

    /// Panic unless the calling thread holds a write guard (debug builds)
    #[track_caller]
    pub fn assert_write_locked(&self) {
        self.holder.lock().assert_locked_exclusive();
    }

    /// Panic unless the calling thread holds a read or write guard (debug builds)
    #[track_caller]
    pub fn assert_read_locked(&self) {
        self.holder.lock().assert_locked_shared();
    }
}

impl<T> Handle<T> {
    /// Advance `lifecycle` to `to`, logging a violation; `true` on success
    fn transition(lifecycle: &Lifecycle, to: HandleState) -> bool {
        match lifecycle.advance(to) {
            Ok(()) => {
                trace!(
                    state = %to,
                    value_type = std::any::type_name::<T>(),
                    "Handle lifecycle advanced"
                );
                true
            }
            Err(e) => {
                error!(
                    error = %e,
                    value_type = std::any::type_name::<T>(),
                    "Handle lifecycle violated"
                );
                false
            }
        }
    }
}

impl<T: 'static> RefCounted for Handle<T> {
    fn rc_header(&self) -> &RcHeader {
        &self.header
    }

    fn will_destroy(&self) {
        Self::transition(&self.lifecycle, HandleState::Destroying);
    }
}

impl<T> Drop for Handle<T> {
    fn drop(&mut self) {
        // Handles dropped without going through `remove_ref` skip the hook
        if self.lifecycle.get() == HandleState::Live {
            Self::transition(&self.lifecycle, HandleState::Destroying);
        }

        debug_assert!(
            !self.holder.lock().is_locked(),
            "handle destroyed while a guard is alive"
        );

        // SAFETY: dropped exactly once, here
        unsafe { ManuallyDrop::drop(&mut self.holder) };

        Self::transition(&self.lifecycle, HandleState::Destroyed);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("state", &self.lifecycle.get())
            .field("ref_count", &self.header.ref_count())
            .finish_non_exhaustive()
    }
}
