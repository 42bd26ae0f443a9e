/*!
 * Synchronization Primitives
 *
 * Reader/writer locking for object handles:
 * - Parking reader/writer lock for multi-threaded programs
 * - Non-blocking, panic-on-conflict mode for single-threaded programs
 * - Debug-build ownership tracking that turns deadlocks into panics
 *
 * # Policy
 *
 * Every lock carries its own `LockingPolicy`. Locks created without one use
 * the process default, which is fixed the first time it is read and can be
 * chosen once beforehand with `install_default_policy`.
 */

mod config;
#[cfg(debug_assertions)]
mod debug;
mod rwlock;

pub use config::{default_policy, install_default_policy, LockingPolicy, SyncConfig};
pub use rwlock::ReaderWriterLock;
