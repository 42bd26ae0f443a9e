/*!
 * Handle Storage
 */

use crate::core::guard::{ReadGuard, WriteGuard};
use crate::core::sync::{LockingPolicy, ReaderWriterLock};
use std::cell::UnsafeCell;

/// One value together with the lock guarding it
pub(crate) struct Holder<T> {
    lock: ReaderWriterLock,
    value: UnsafeCell<T>,
}

// SAFETY: the value is only reached through the lock: shared references
// under a shared hold, a unique reference under the exclusive hold
unsafe impl<T: Send + Sync> Sync for Holder<T> {}

impl<T> Holder<T> {
    pub fn new(value: T, policy: LockingPolicy) -> Self {
        Self {
            lock: ReaderWriterLock::with_policy(policy),
            value: UnsafeCell::new(value),
        }
    }

    #[inline]
    pub fn lock(&self) -> &ReaderWriterLock {
        &self.lock
    }

    pub fn read(&self) -> ReadGuard<'_, T> {
        let lock = self.lock.shared();
        // SAFETY: the shared hold excludes writers for the guard's lifetime
        unsafe { ReadGuard::new(&*self.value.get(), lock) }
    }

    pub fn write(&self) -> WriteGuard<'_, T> {
        let lock = self.lock.exclusive();
        // SAFETY: the exclusive hold excludes every other access
        unsafe { WriteGuard::new(&mut *self.value.get(), lock) }
    }
}
