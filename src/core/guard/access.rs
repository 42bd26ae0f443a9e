/*!
 * Access Guards
 *
 * Borrowed views of a locked value
 */

use super::lock::{ExclusiveLock, SharedLock};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Shared access to a value, valid while its lock is held shared
///
/// Obtained from a handle's `begin_read`; ends with [`end_read`](Self::end_read)
/// or at end of scope.
pub struct ReadGuard<'a, T: ?Sized> {
    value: &'a T,
    _lock: SharedLock<'a>,
}

impl<'a, T: ?Sized> ReadGuard<'a, T> {
    /// # Safety
    ///
    /// `lock` must be the shared hold on the lock that protects `value`.
    pub(crate) unsafe fn new(value: &'a T, lock: SharedLock<'a>) -> Self {
        Self { value, _lock: lock }
    }

    /// Release shared access
    pub fn end_read(self) {}

    /// Narrow the guard to part of the value, keeping the lock held
    pub fn map<U: ?Sized, F>(guard: Self, f: F) -> ReadGuard<'a, U>
    where
        F: FnOnce(&T) -> &U,
    {
        let ReadGuard { value, _lock } = guard;
        ReadGuard {
            value: f(value),
            _lock,
        }
    }
}

impl<T: ?Sized> Deref for ReadGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        self.value
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for ReadGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.value, f)
    }
}

/// Exclusive access to a value, valid while its lock is held exclusively
///
/// Obtained from a handle's `begin_edit`; ends with [`end_edit`](Self::end_edit)
/// or at end of scope.
pub struct WriteGuard<'a, T: ?Sized> {
    value: &'a mut T,
    _lock: ExclusiveLock<'a>,
}

impl<'a, T: ?Sized> WriteGuard<'a, T> {
    /// # Safety
    ///
    /// `lock` must be the exclusive hold on the lock that protects `value`.
    pub(crate) unsafe fn new(value: &'a mut T, lock: ExclusiveLock<'a>) -> Self {
        Self { value, _lock: lock }
    }

    /// Release exclusive access, publishing every change made through the guard
    pub fn end_edit(self) {}

    /// Narrow the guard to part of the value, keeping the lock held
    pub fn map<U: ?Sized, F>(guard: Self, f: F) -> WriteGuard<'a, U>
    where
        F: FnOnce(&mut T) -> &mut U,
    {
        let WriteGuard { value, _lock } = guard;
        WriteGuard {
            value: f(value),
            _lock,
        }
    }
}

impl<T: ?Sized> Deref for WriteGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        self.value
    }
}

impl<T: ?Sized> DerefMut for WriteGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        self.value
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for WriteGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.value, f)
    }
}
