/*!
 * Handle Tests
 * Guarded access, aliasing versus copying, and concurrent edits
 */

use handle_kernel::core::guard::{ReadGuard, WriteGuard};
use handle_kernel::core::sync::LockingPolicy;
use handle_kernel::handle::{Handle, HandleState};
use handle_kernel::refcount::{RefCounted, SharedPtr};
use pretty_assertions::assert_eq;
use std::thread;

#[derive(Debug, Clone, Default, PartialEq)]
struct Camera {
    position: [f32; 3],
    fov: f32,
}

#[test]
fn test_alias_sees_edits() {
    let first = Handle::create(0i32);
    let second = first.clone();
    assert!(first.is_shared());

    let mut value = first.begin_edit();
    *value = 42;
    value.end_edit();

    assert_eq!(*second.begin_read(), 42);
}

#[test]
fn test_clone_handle_is_independent() {
    let original = Handle::create(Camera {
        fov: 60.0,
        ..Default::default()
    });
    let copy = original.clone_handle();

    copy.edit(|camera| camera.fov = 90.0);
    assert_eq!(original.read(|camera| camera.fov), 60.0);
    assert_eq!(copy.read(|camera| camera.fov), 90.0);
    assert!(!original.is_shared());
    assert!(!copy.is_shared());
}

#[test]
fn test_guards_expose_lock_state() {
    let handle = Handle::create_with_policy(Camera::default(), LockingPolicy::MultiThreaded);

    {
        let first = handle.begin_read();
        let second = handle.begin_read();
        assert_eq!(handle.reader_count(), 2);
        assert_eq!(first.fov, second.fov);
    }
    assert_eq!(handle.reader_count(), 0);

    let writer = handle.begin_edit();
    assert!(handle.is_write_locked());
    drop(writer);
    assert!(!handle.is_write_locked());
}

#[test]
fn test_mapped_guards() {
    let handle = Handle::create(Camera::default());

    let mut position = WriteGuard::map(handle.begin_edit(), |camera| &mut camera.position);
    position[1] = 2.5;
    drop(position);

    let y = ReadGuard::map(handle.begin_read(), |camera| &camera.position[1]);
    assert_eq!(*y, 2.5);
}

#[test]
fn test_concurrent_edits_are_serialized() {
    let counter = Handle::create_with_policy(0u64, LockingPolicy::MultiThreaded);

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..250 {
                    let mut value = counter.begin_edit();
                    let next = *value + 1;
                    thread::yield_now();
                    *value = next;
                }
                counter.read(|value| *value)
            })
        })
        .collect();

    for worker in workers {
        assert!(worker.join().unwrap() <= 1000);
    }
    assert_eq!(*counter.begin_read(), 1000);
    assert_eq!(counter.ref_count(), 1);
}

#[test]
fn test_single_threaded_handle() {
    let handle = Handle::create_with_policy(vec![1u8], LockingPolicy::SingleThreaded);
    assert_eq!(handle.policy(), LockingPolicy::SingleThreaded);

    handle.edit(|items| items.push(2));
    let (a, b) = (handle.begin_read(), handle.begin_read());
    assert_eq!(a.len() + b.len(), 4);
}

#[test]
fn test_default_and_fallible_creation() {
    let default = Handle::<Camera>::create_default();
    assert_eq!(*default.begin_read(), Camera::default());

    let fallible = Handle::try_create(String::from("ok")).unwrap();
    assert_eq!(fallible.state(), HandleState::Live);
    assert!(fallible.is_notify_allowed());
}

#[test]
fn test_unshareable_handle_is_copied_on_share() {
    let original = Handle::create(Camera::default());
    original.mark_unshareable();

    let shared = original.share();
    assert!(!SharedPtr::ptr_eq(&original, &shared));
    assert!(!original.is_shareable());

    // Editing the copy leaves the original alone
    shared.edit(|camera| camera.fov = 30.0);
    assert_eq!(original.read(|camera| camera.fov), 0.0);
}

#[test]
fn test_edit_unique_detaches_aliases() {
    let original = Handle::create(vec![1, 2, 3]);
    let mut alias = original.clone();

    alias.edit_unique().push(4);
    assert_eq!(original.begin_read().len(), 3);
    assert_eq!(alias.begin_read().len(), 4);
    assert!(!SharedPtr::ptr_eq(&original, &alias));
}
