/*!
 * Lock Guards
 *
 * Scoped exclusive and shared ownership of a `ReaderWriterLock`
 */

use super::traits::{Guard, GuardDrop};
use super::{GuardError, GuardMetadata, GuardResult};
use crate::core::sync::ReaderWriterLock;
use crate::monitoring::LockWaitTimer;
use std::marker::PhantomData;
use tracing::trace;

/// Marker keeping guards on the thread that acquired them
type NotSend = PhantomData<*const ()>;

/// Exclusive hold on a lock, released on drop
///
/// # Example
///
/// ```rust
/// use handle_kernel::core::guard::{ExclusiveLock, Guard};
/// use handle_kernel::core::sync::{LockingPolicy, ReaderWriterLock};
///
/// let lock = ReaderWriterLock::with_policy(LockingPolicy::MultiThreaded);
/// let mut guard = ExclusiveLock::new(&lock);
/// assert!(lock.is_locked_exclusive());
///
/// guard.release().unwrap();
/// assert!(guard.release().is_err());
/// assert!(!lock.is_locked());
/// ```
pub struct ExclusiveLock<'a> {
    lock: Option<&'a ReaderWriterLock>,
    metadata: GuardMetadata,
    _not_send: NotSend,
}

impl<'a> ExclusiveLock<'a> {
    /// Block until `lock` is held exclusively
    pub fn new(lock: &'a ReaderWriterLock) -> Self {
        let timer = LockWaitTimer::start("exclusive");
        lock.lock_exclusive();
        let acquired_at = timer.finish();
        Self {
            lock: Some(lock),
            metadata: GuardMetadata::acquired_at("rwlock_exclusive", acquired_at),
            _not_send: PhantomData,
        }
    }

    /// Release now instead of at end of scope
    pub fn unlock(mut self) {
        self.on_drop();
    }
}

impl Guard for ExclusiveLock<'_> {
    fn resource_type(&self) -> &'static str {
        self.metadata.resource_type
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }

    fn is_active(&self) -> bool {
        self.lock.is_some()
    }

    fn release(&mut self) -> GuardResult<()> {
        let lock = self.lock.take().ok_or(GuardError::AlreadyReleased)?;
        // SAFETY: acquired exclusively in `new`, released exactly once
        unsafe { lock.unlock_exclusive() };
        trace!(
            held_micros = self.metadata.lifetime_micros(),
            "Exclusive lock released"
        );
        Ok(())
    }
}

impl GuardDrop for ExclusiveLock<'_> {
    fn on_drop(&mut self) {
        // Already released manually is fine
        let _ = self.release();
    }
}

impl Drop for ExclusiveLock<'_> {
    fn drop(&mut self) {
        self.on_drop();
    }
}

/// Shared hold on a lock, released on drop
pub struct SharedLock<'a> {
    lock: Option<&'a ReaderWriterLock>,
    metadata: GuardMetadata,
    _not_send: NotSend,
}

impl<'a> SharedLock<'a> {
    /// Block while `lock` is held exclusively, then hold it shared
    pub fn new(lock: &'a ReaderWriterLock) -> Self {
        let timer = LockWaitTimer::start("shared");
        lock.lock_shared();
        let acquired_at = timer.finish();
        Self {
            lock: Some(lock),
            metadata: GuardMetadata::acquired_at("rwlock_shared", acquired_at),
            _not_send: PhantomData,
        }
    }

    /// Release now instead of at end of scope
    pub fn unlock(mut self) {
        self.on_drop();
    }
}

impl Guard for SharedLock<'_> {
    fn resource_type(&self) -> &'static str {
        self.metadata.resource_type
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }

    fn is_active(&self) -> bool {
        self.lock.is_some()
    }

    fn release(&mut self) -> GuardResult<()> {
        let lock = self.lock.take().ok_or(GuardError::AlreadyReleased)?;
        // SAFETY: acquired shared in `new`, released exactly once
        unsafe { lock.unlock_shared() };
        trace!(
            held_micros = self.metadata.lifetime_micros(),
            "Shared lock released"
        );
        Ok(())
    }
}

impl GuardDrop for SharedLock<'_> {
    fn on_drop(&mut self) {
        let _ = self.release();
    }
}

impl Drop for SharedLock<'_> {
    fn drop(&mut self) {
        self.on_drop();
    }
}
