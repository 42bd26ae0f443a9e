/*!
 * Handle Kernel Library
 * Slab-backed, reference-counted, lock-guarded object handles
 *
 * Layers, bottom-up:
 * - memory: size-class slab allocator and the `SlabBox` owner
 * - core: errors, configuration, reader/writer lock and access guards
 * - refcount: intrusive counting and `SharedPtr`
 * - handle: `Handle<T>` and base-level views through `ObjectHandle`
 * - monitoring: tracing setup and timing helpers
 */

pub mod core;
pub mod handle;
pub mod memory;
pub mod monitoring;
pub mod refcount;

// Re-exports
pub use crate::core::{
    init_from_env, ConfigError, GuardError, KernelConfig, KernelError, KernelResult,
    LockingPolicy, ReadGuard, ReaderWriterLock, WriteGuard,
};
pub use handle::{Derives, FromBase, Handle, HandleState, ObjectHandle};
pub use memory::{MemoryError, SlabAllocator, SlabBox, SlabConfig};
pub use monitoring::init_tracing;
pub use refcount::{RcHeader, RcVec, RefCounted, SharedPtr};
