/*!
 * Core Module
 * Fundamental kernel types, configuration, locking and error handling
 */

pub mod config;
pub mod errors;
pub mod guard;
pub mod sync;
pub mod types;

// Re-export for convenience
pub use config::{init_from_env, KernelConfig};
pub use errors::*;
pub use guard::{
    ExclusiveLock, Guard, GuardDrop, GuardError, GuardMetadata, GuardResult, ReadGuard,
    SharedLock, WriteGuard,
};
pub use sync::{LockingPolicy, ReaderWriterLock, SyncConfig};
pub use types::*;
