/*!
 * RAII Resource Guards
 *
 * Scoped lock ownership and guarded object access.
 *
 * ## Guard Types
 *
 * - **ExclusiveLock / SharedLock**: Hold a `ReaderWriterLock` for a scope
 * - **WriteGuard / ReadGuard**: Mutable or shared access to a handle's
 *   value, tied to the lock guard that protects it
 *
 * Guards borrow what they protect, so touching a value after its guard is
 * released does not compile. Guards stay on the thread that acquired them.
 *
 * ## Example
 *
 * ```rust
 * use handle_kernel::core::sync::{LockingPolicy, ReaderWriterLock};
 *
 * let lock = ReaderWriterLock::with_policy(LockingPolicy::MultiThreaded);
 * {
 *     let _writer = lock.exclusive();
 *     assert!(lock.is_locked_exclusive());
 * } // released here
 * assert!(!lock.is_locked());
 * ```
 */

mod access;
mod lock;
mod traits;

pub use access::{ReadGuard, WriteGuard};
pub use lock::{ExclusiveLock, SharedLock};
pub use traits::{Guard, GuardDrop};

use miette::Diagnostic;
use std::time::Instant;

/// Result type for guard operations
pub type GuardResult<T> = Result<T, GuardError>;

/// Errors that can occur during guard operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Diagnostic)]
pub enum GuardError {
    #[error("Resource already released")]
    #[diagnostic(code(guard::already_released))]
    AlreadyReleased,

    #[error("Invalid state transition: {from} -> {to}")]
    #[diagnostic(
        code(guard::invalid_transition),
        help("Handle lifecycle only moves forward: uninitialized, constructing, live, destroying, destroyed.")
    )]
    InvalidTransition { from: &'static str, to: &'static str },
}

/// Guard metadata for observability
#[derive(Debug, Clone)]
pub struct GuardMetadata {
    pub resource_type: &'static str,
    pub creation_time: Instant,
}

impl GuardMetadata {
    /// Metadata for a guard whose resource was acquired at `acquired_at`
    #[inline]
    pub fn acquired_at(resource_type: &'static str, acquired_at: Instant) -> Self {
        Self {
            resource_type,
            creation_time: acquired_at,
        }
    }

    #[inline]
    pub fn lifetime_micros(&self) -> u64 {
        self.creation_time.elapsed().as_micros() as u64
    }
}
