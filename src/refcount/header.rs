/*!
 * Reference Count Header
 * Counter, shareability flag and destroy callbacks embedded in an object
 */

use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Callback run just before a counted object is destroyed
///
/// Receives a read-only view of the object and the context value given at
/// registration.
pub type DestroyCallback = fn(&dyn Any, usize);

/// Intrusive reference-count state
///
/// Embed one in every type implementing [`RefCounted`](super::RefCounted).
/// Cloning a header yields a fresh one: a copied object starts with no
/// owners, is shareable, and has no callbacks.
pub struct RcHeader {
    count: Mutex<usize>,
    shareable: AtomicBool,
    callbacks: Mutex<Vec<(DestroyCallback, usize)>>,
}

impl RcHeader {
    pub fn new() -> Self {
        Self {
            count: Mutex::new(0),
            shareable: AtomicBool::new(true),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    /// Increment the count; returns the new count
    pub fn add_ref(&self) -> usize {
        let mut count = self.count.lock();
        *count += 1;
        *count
    }

    /// Decrement the count; returns the new count
    pub(crate) fn release(&self) -> usize {
        let mut count = self.count.lock();
        debug_assert!(*count > 0, "reference count released below zero");
        *count -= 1;
        *count
    }

    pub fn ref_count(&self) -> usize {
        *self.count.lock()
    }

    /// More than one owner
    pub fn is_shared(&self) -> bool {
        self.ref_count() > 1
    }

    pub fn is_shareable(&self) -> bool {
        self.shareable.load(Ordering::Acquire)
    }

    /// Forbid aliasing from now on; there is no way back
    pub fn mark_unshareable(&self) {
        self.shareable.store(false, Ordering::Release);
    }

    /// Register `callback` to run with `context` before destruction
    ///
    /// Callbacks run in registration order. Registering the same pair twice
    /// is a logic error, caught in debug builds.
    pub fn add_on_destroy_callback(&self, callback: DestroyCallback, context: usize) {
        let mut callbacks = self.callbacks.lock();
        debug_assert!(
            !callbacks.iter().any(|entry| same_entry(entry, callback, context)),
            "destroy callback registered twice"
        );
        callbacks.push((callback, context));
    }

    /// Unregister a pair added with [`add_on_destroy_callback`](Self::add_on_destroy_callback)
    pub fn remove_on_destroy_callback(&self, callback: DestroyCallback, context: usize) {
        let mut callbacks = self.callbacks.lock();
        let position = callbacks
            .iter()
            .position(|entry| same_entry(entry, callback, context));
        debug_assert!(position.is_some(), "removing an unregistered destroy callback");
        if let Some(position) = position {
            callbacks.remove(position);
        }
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.lock().len()
    }

    /// Hand the callbacks to the destroyer, leaving none behind
    pub(crate) fn take_callbacks(&self) -> Vec<(DestroyCallback, usize)> {
        std::mem::take(&mut *self.callbacks.lock())
    }
}

fn same_entry(entry: &(DestroyCallback, usize), callback: DestroyCallback, context: usize) -> bool {
    entry.0 as usize == callback as usize && entry.1 == context
}

impl Default for RcHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for RcHeader {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl fmt::Debug for RcHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RcHeader")
            .field("count", &self.ref_count())
            .field("shareable", &self.is_shareable())
            .field("callbacks", &self.callback_count())
            .finish()
    }
}
