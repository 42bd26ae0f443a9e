/*!
 * Reader/Writer Lock
 *
 * Single-writer/multi-reader lock with a per-lock locking policy
 */

use super::config::{default_policy, LockingPolicy};
#[cfg(debug_assertions)]
use super::debug::LockOwnership;
use crate::core::guard::{ExclusiveLock, SharedLock};
use parking_lot::lock_api::{RawRwLock as _, RawRwLockRecursive as _};
use parking_lot::RawRwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// State word value marking exclusive ownership under `SingleThreaded`
const EXCLUSIVE: usize = usize::MAX;

enum RawState {
    /// Parking reader/writer lock
    Blocking {
        raw: RawRwLock,
        readers: AtomicUsize,
        writer: AtomicBool,
    },
    /// Shared count, or `EXCLUSIVE`
    Unsynchronized(AtomicUsize),
}

/// Reader/writer lock: any number of shared holders, or one exclusive holder
///
/// # Semantics
///
/// - Shared holders never block each other; a shared request waits only
///   while the lock is held exclusively
/// - Acquisition blocks without timeout
/// - Upgrading shared to exclusive, and re-entrant exclusive locking,
///   deadlock; debug builds panic instead
///
/// Under [`LockingPolicy::SingleThreaded`] no acquisition ever blocks: a
/// conflicting request panics. Memory ordering between non-overlapping
/// holders is still established.
pub struct ReaderWriterLock {
    state: RawState,
    #[cfg(debug_assertions)]
    ownership: LockOwnership,
}

impl ReaderWriterLock {
    /// New lock using the process default policy
    pub fn new() -> Self {
        Self::with_policy(default_policy())
    }

    pub fn with_policy(policy: LockingPolicy) -> Self {
        let state = match policy {
            LockingPolicy::MultiThreaded => RawState::Blocking {
                raw: RawRwLock::INIT,
                readers: AtomicUsize::new(0),
                writer: AtomicBool::new(false),
            },
            LockingPolicy::SingleThreaded => RawState::Unsynchronized(AtomicUsize::new(0)),
        };
        Self {
            state,
            #[cfg(debug_assertions)]
            ownership: LockOwnership::default(),
        }
    }

    pub fn policy(&self) -> LockingPolicy {
        match self.state {
            RawState::Blocking { .. } => LockingPolicy::MultiThreaded,
            RawState::Unsynchronized(_) => LockingPolicy::SingleThreaded,
        }
    }

    /// Block until the calling thread is the only holder
    pub fn lock_exclusive(&self) {
        #[cfg(debug_assertions)]
        self.ownership.before_exclusive();

        match &self.state {
            RawState::Blocking { raw, writer, .. } => {
                raw.lock_exclusive();
                writer.store(true, Ordering::Relaxed);
            }
            RawState::Unsynchronized(word) => {
                if word
                    .compare_exchange(0, EXCLUSIVE, Ordering::Acquire, Ordering::Relaxed)
                    .is_err()
                {
                    panic!("conflicting exclusive lock under single-threaded locking policy");
                }
            }
        }

        #[cfg(debug_assertions)]
        self.ownership.acquired_exclusive();
    }

    /// Release exclusive ownership
    ///
    /// # Safety
    ///
    /// The calling thread must hold the lock exclusively.
    pub unsafe fn unlock_exclusive(&self) {
        #[cfg(debug_assertions)]
        self.ownership.before_unlock_exclusive();

        match &self.state {
            RawState::Blocking { raw, writer, .. } => {
                writer.store(false, Ordering::Relaxed);
                raw.unlock_exclusive();
            }
            RawState::Unsynchronized(word) => word.store(0, Ordering::Release),
        }
    }

    /// Block while the lock is held exclusively, then join the shared holders
    pub fn lock_shared(&self) {
        #[cfg(debug_assertions)]
        self.ownership.before_shared();

        match &self.state {
            RawState::Blocking { raw, readers, .. } => {
                // Recursive acquisition does not queue behind waiting writers
                raw.lock_shared_recursive();
                readers.fetch_add(1, Ordering::Relaxed);
            }
            RawState::Unsynchronized(word) => {
                let joined = word.fetch_update(Ordering::Acquire, Ordering::Relaxed, |count| {
                    (count != EXCLUSIVE).then(|| count + 1)
                });
                if joined.is_err() {
                    panic!("shared lock during exclusive access under single-threaded locking policy");
                }
            }
        }

        #[cfg(debug_assertions)]
        self.ownership.acquired_shared();
    }

    /// Leave the shared holders
    ///
    /// # Safety
    ///
    /// The calling thread must hold a shared lock on this lock.
    pub unsafe fn unlock_shared(&self) {
        #[cfg(debug_assertions)]
        self.ownership.before_unlock_shared();

        match &self.state {
            RawState::Blocking { raw, readers, .. } => {
                readers.fetch_sub(1, Ordering::Relaxed);
                raw.unlock_shared();
            }
            RawState::Unsynchronized(word) => {
                word.fetch_sub(1, Ordering::Release);
            }
        }
    }

    /// Acquire exclusively for the lifetime of the returned guard
    pub fn exclusive(&self) -> ExclusiveLock<'_> {
        ExclusiveLock::new(self)
    }

    /// Acquire shared for the lifetime of the returned guard
    pub fn shared(&self) -> SharedLock<'_> {
        SharedLock::new(self)
    }

    pub fn is_locked_exclusive(&self) -> bool {
        match &self.state {
            RawState::Blocking { writer, .. } => writer.load(Ordering::Relaxed),
            RawState::Unsynchronized(word) => word.load(Ordering::Relaxed) == EXCLUSIVE,
        }
    }

    /// Current number of shared holders (a snapshot)
    pub fn shared_count(&self) -> usize {
        match &self.state {
            RawState::Blocking { readers, .. } => readers.load(Ordering::Relaxed),
            RawState::Unsynchronized(word) => match word.load(Ordering::Relaxed) {
                EXCLUSIVE => 0,
                count => count,
            },
        }
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked_exclusive() || self.shared_count() > 0
    }

    /// Panic unless the calling thread holds the lock exclusively
    ///
    /// Only checked in debug builds.
    #[track_caller]
    pub fn assert_locked_exclusive(&self) {
        #[cfg(debug_assertions)]
        assert!(
            self.ownership.held_exclusive_by_current(),
            "lock is not held exclusively by the current thread"
        );
    }

    /// Panic unless the calling thread holds the lock shared or exclusively
    ///
    /// Only checked in debug builds.
    #[track_caller]
    pub fn assert_locked_shared(&self) {
        #[cfg(debug_assertions)]
        assert!(
            self.ownership.held_shared_by_current() || self.ownership.held_exclusive_by_current(),
            "lock is not held by the current thread"
        );
    }
}

impl Default for ReaderWriterLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReaderWriterLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderWriterLock")
            .field("policy", &self.policy())
            .field("exclusive", &self.is_locked_exclusive())
            .field("shared", &self.shared_count())
            .finish()
    }
}
