/*!
 * Lock Ownership Tracking
 *
 * Debug-build bookkeeping of which threads hold a lock and how
 */

use ahash::RandomState;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::thread::{self, ThreadId};

#[derive(Default)]
struct Holders {
    /// Shared acquisitions per thread
    shared: HashMap<ThreadId, usize, RandomState>,
    exclusive: Option<ThreadId>,
}

/// Per-lock record of current holders
///
/// Every check panics on misuse that would otherwise deadlock or corrupt the
/// lock state. Checks run before the raw lock is touched.
#[derive(Default)]
pub(crate) struct LockOwnership {
    holders: Mutex<Holders>,
}

impl LockOwnership {
    pub fn before_exclusive(&self) {
        let me = thread::current().id();
        let holders = self.holders.lock();
        assert!(
            holders.exclusive != Some(me),
            "re-entrant exclusive lock on the same thread"
        );
        assert!(
            !holders.shared.contains_key(&me),
            "exclusive lock requested while this thread holds a shared lock"
        );
    }

    pub fn acquired_exclusive(&self) {
        self.holders.lock().exclusive = Some(thread::current().id());
    }

    pub fn before_unlock_exclusive(&self) {
        let me = thread::current().id();
        let mut holders = self.holders.lock();
        assert!(
            holders.exclusive == Some(me),
            "unlock_exclusive without a matching lock_exclusive"
        );
        holders.exclusive = None;
    }

    pub fn before_shared(&self) {
        let me = thread::current().id();
        assert!(
            self.holders.lock().exclusive != Some(me),
            "shared lock requested while this thread holds the exclusive lock"
        );
    }

    pub fn acquired_shared(&self) {
        *self
            .holders
            .lock()
            .shared
            .entry(thread::current().id())
            .or_insert(0) += 1;
    }

    pub fn before_unlock_shared(&self) {
        let me = thread::current().id();
        let mut holders = self.holders.lock();
        match holders.shared.get_mut(&me) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                holders.shared.remove(&me);
            }
            None => panic!("unlock_shared without a matching lock_shared"),
        }
    }

    pub fn held_exclusive_by_current(&self) -> bool {
        self.holders.lock().exclusive == Some(thread::current().id())
    }

    pub fn held_shared_by_current(&self) -> bool {
        self.holders
            .lock()
            .shared
            .contains_key(&thread::current().id())
    }
}
