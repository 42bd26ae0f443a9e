/*!
 * Reader/Writer Lock Tests
 * Mutual exclusion under contention and reader/writer interplay
 */

use handle_kernel::core::guard::Guard;
use handle_kernel::core::sync::{LockingPolicy, ReaderWriterLock};
use pretty_assertions::assert_eq;
use rand::Rng;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Counter whose increments race unless the lock is honored
struct Guarded {
    lock: ReaderWriterLock,
    value: UnsafeCell<u64>,
    writing: AtomicBool,
    readers: AtomicUsize,
}

// SAFETY: `value` is only touched under `lock`
unsafe impl Sync for Guarded {}

impl Guarded {
    fn new() -> Self {
        Self {
            lock: ReaderWriterLock::with_policy(LockingPolicy::MultiThreaded),
            value: UnsafeCell::new(0),
            writing: AtomicBool::new(false),
            readers: AtomicUsize::new(0),
        }
    }

    fn increment(&self) {
        let _guard = self.lock.exclusive();
        assert!(!self.writing.swap(true, Ordering::SeqCst), "two writers");
        assert_eq!(self.readers.load(Ordering::SeqCst), 0, "writer beside readers");

        let value = unsafe { *self.value.get() };
        thread::yield_now();
        unsafe { *self.value.get() = value + 1 };

        self.writing.store(false, Ordering::SeqCst);
    }

    fn observe(&self) -> u64 {
        let _guard = self.lock.shared();
        self.readers.fetch_add(1, Ordering::SeqCst);
        assert!(!self.writing.load(Ordering::SeqCst), "reader beside writer");
        let value = unsafe { *self.value.get() };
        self.readers.fetch_sub(1, Ordering::SeqCst);
        value
    }
}

#[test]
fn test_exclusion_under_contention() {
    let guarded = Arc::new(Guarded::new());
    let writes = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let guarded = Arc::clone(&guarded);
            let writes = Arc::clone(&writes);
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                for _ in 0..500 {
                    if rng.gen_bool(0.3) {
                        guarded.increment();
                        writes.fetch_add(1, Ordering::SeqCst);
                    } else {
                        guarded.observe();
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(guarded.observe(), writes.load(Ordering::SeqCst) as u64);
    assert!(!guarded.lock.is_locked());
}

#[test]
fn test_readers_do_not_block_each_other() {
    let lock = ReaderWriterLock::with_policy(LockingPolicy::MultiThreaded);
    let _held = lock.shared();

    let count = thread::scope(|scope| {
        scope
            .spawn(|| {
                let _second = lock.shared();
                lock.shared_count()
            })
            .join()
            .unwrap()
    });
    assert_eq!(count, 2);
}

#[test]
fn test_writer_waits_for_readers() {
    let lock = ReaderWriterLock::with_policy(LockingPolicy::MultiThreaded);
    let acquired = AtomicBool::new(false);

    thread::scope(|scope| {
        let reader = lock.shared();
        let writer = scope.spawn(|| {
            let _guard = lock.exclusive();
            acquired.store(true, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!acquired.load(Ordering::SeqCst));

        drop(reader);
        writer.join().unwrap();
    });

    assert!(acquired.load(Ordering::SeqCst));
    assert!(!lock.is_locked());
}

#[test]
fn test_explicit_release_ends_hold() {
    let lock = ReaderWriterLock::with_policy(LockingPolicy::MultiThreaded);
    let mut writer = lock.exclusive();
    assert!(writer.is_active());
    assert_eq!(writer.resource_type(), "rwlock_exclusive");

    writer.release().unwrap();
    assert!(!lock.is_locked_exclusive());

    // A released guard is inert on drop
    let reader = lock.shared();
    drop(writer);
    assert_eq!(lock.shared_count(), 1);
    reader.unlock();
}

#[cfg(debug_assertions)]
mod ownership {
    use super::*;

    #[test]
    #[should_panic(expected = "re-entrant exclusive lock")]
    fn test_reentrant_exclusive_panics() {
        let lock = ReaderWriterLock::with_policy(LockingPolicy::MultiThreaded);
        let _first = lock.exclusive();
        let _second = lock.exclusive();
    }

    #[test]
    #[should_panic(expected = "holds a shared lock")]
    fn test_upgrade_panics() {
        let lock = ReaderWriterLock::with_policy(LockingPolicy::MultiThreaded);
        let _reader = lock.shared();
        let _writer = lock.exclusive();
    }

    #[test]
    #[should_panic(expected = "not held exclusively")]
    fn test_assert_without_lock_panics() {
        let lock = ReaderWriterLock::with_policy(LockingPolicy::MultiThreaded);
        lock.assert_locked_exclusive();
    }

    #[test]
    fn test_assert_holds_on_owning_thread_only() {
        let lock = ReaderWriterLock::with_policy(LockingPolicy::MultiThreaded);
        let _writer = lock.exclusive();
        lock.assert_locked_exclusive();
        lock.assert_locked_shared();

        let outcome = thread::scope(|scope| {
            scope.spawn(|| lock.assert_locked_exclusive()).join()
        });
        assert!(outcome.is_err());
    }
}
