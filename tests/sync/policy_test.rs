/*!
 * Locking Policy Tests
 * Single-threaded locks never block and reject overlapping conflicts
 */

use handle_kernel::core::sync::{default_policy, LockingPolicy, ReaderWriterLock};
use handle_kernel::core::ConfigError;
use pretty_assertions::assert_eq;
use std::panic;
use std::thread;

#[test]
fn test_single_threaded_sequential_use() {
    let lock = ReaderWriterLock::with_policy(LockingPolicy::SingleThreaded);
    assert_eq!(lock.policy(), LockingPolicy::SingleThreaded);

    for _ in 0..3 {
        let first = lock.shared();
        let second = lock.shared();
        assert_eq!(lock.shared_count(), 2);
        drop((first, second));

        let writer = lock.exclusive();
        assert!(lock.is_locked_exclusive());
        assert_eq!(lock.shared_count(), 0);
        drop(writer);
    }
    assert!(!lock.is_locked());
}

#[test]
fn test_single_threaded_conflict_panics() {
    let outcome = panic::catch_unwind(|| {
        let lock = ReaderWriterLock::with_policy(LockingPolicy::SingleThreaded);
        let _reader = lock.shared();
        let _writer = lock.exclusive();
    });
    assert!(outcome.is_err());
}

#[test]
fn test_single_threaded_cross_thread_conflict_panics() {
    let lock = ReaderWriterLock::with_policy(LockingPolicy::SingleThreaded);
    let writer = lock.exclusive();

    let outcome = thread::scope(|scope| {
        scope
            .spawn(|| {
                let _reader = lock.shared();
            })
            .join()
    });
    assert!(outcome.is_err());

    drop(writer);
    assert!(!lock.is_locked());
}

#[test]
fn test_new_lock_follows_default_policy() {
    let lock = ReaderWriterLock::new();
    assert_eq!(lock.policy(), default_policy());
    assert_eq!(ReaderWriterLock::default().policy(), default_policy());
}

#[test]
fn test_policy_names() {
    for policy in [LockingPolicy::MultiThreaded, LockingPolicy::SingleThreaded] {
        assert_eq!(policy.to_string().parse::<LockingPolicy>().unwrap(), policy);
    }
    assert!(matches!(
        "spin".parse::<LockingPolicy>(),
        Err(ConfigError::Invalid {
            field: "locking",
            ..
        })
    ));
    assert_eq!(
        serde_json::to_string(&LockingPolicy::SingleThreaded).unwrap(),
        "\"single_threaded\""
    );
}
