/*!
 * Synchronization Configuration
 *
 * Locking policy selection, fixed once per process
 */

use crate::core::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::info;

/// How a [`ReaderWriterLock`](super::ReaderWriterLock) synchronizes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockingPolicy {
    /// Blocking reader/writer lock (parking_lot)
    #[default]
    MultiThreaded,
    /// No blocking at all; overlapping conflicting access panics
    ///
    /// For programs that touch handles from one thread at a time.
    SingleThreaded,
}

impl LockingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockingPolicy::MultiThreaded => "multi",
            LockingPolicy::SingleThreaded => "single",
        }
    }
}

impl FromStr for LockingPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "multi" | "multi_threaded" | "multithreaded" => Ok(LockingPolicy::MultiThreaded),
            "single" | "single_threaded" | "singlethreaded" => Ok(LockingPolicy::SingleThreaded),
            _ => Err(ConfigError::Invalid {
                field: "locking",
                reason: format!("unknown locking policy {:?}", s),
            }),
        }
    }
}

impl std::fmt::Display for LockingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synchronization configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Policy for locks created without an explicit one
    pub locking: LockingPolicy,
}

impl SyncConfig {
    pub const fn multi_threaded() -> Self {
        Self {
            locking: LockingPolicy::MultiThreaded,
        }
    }

    pub const fn single_threaded() -> Self {
        Self {
            locking: LockingPolicy::SingleThreaded,
        }
    }
}

static DEFAULT_POLICY: OnceLock<LockingPolicy> = OnceLock::new();

/// Fix the process default locking policy
///
/// Succeeds only if no lock has consulted the default yet and no other
/// policy was installed before.
pub fn install_default_policy(policy: LockingPolicy) -> Result<(), ConfigError> {
    DEFAULT_POLICY
        .set(policy)
        .map_err(|_| ConfigError::AlreadyInstalled {
            component: "locking policy",
        })?;
    info!(policy = %policy, "Default locking policy installed");
    Ok(())
}

/// The process default locking policy; fixes it to `MultiThreaded` if unset
pub fn default_policy() -> LockingPolicy {
    *DEFAULT_POLICY.get_or_init(LockingPolicy::default)
}
