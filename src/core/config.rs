/*!
 * Kernel Configuration
 * Process-wide settings loaded from JSON or the environment
 */

use crate::core::errors::ConfigError;
use crate::core::sync::{install_default_policy, SyncConfig};
use crate::core::types::KernelResult;
use crate::memory::slab::ensure_slab_config_open;
use crate::memory::{install_slab_config, SlabConfig};
use crate::monitoring::init_tracing;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Locking policy for locks created without one (`multi` or `single`)
pub const ENV_LOCKING: &str = "KERNEL_LOCKING";
/// Largest pooled block size in bytes
pub const ENV_SLAB_MAX_BLOCK: &str = "KERNEL_SLAB_MAX_BLOCK";
/// Blocks per slab chunk (1..=255)
pub const ENV_SLAB_BLOCKS_PER_CHUNK: &str = "KERNEL_SLAB_BLOCKS_PER_CHUNK";
/// Leak tracking toggle (`1`/`0`, `true`/`false`, `on`/`off`)
pub const ENV_SLAB_TRACK_LEAKS: &str = "KERNEL_SLAB_TRACK_LEAKS";

/// Complete kernel configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub sync: SyncConfig,
    pub slab: SlabConfig,
}

impl KernelConfig {
    /// Parse and validate a JSON document; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Defaults overridden by the `KERNEL_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_LOCKING) {
            self.sync.locking = value.parse().map_err(|_| ConfigError::Environment {
                var: ENV_LOCKING,
                value,
            })?;
        }
        if let Some(value) = lookup(ENV_SLAB_MAX_BLOCK) {
            self.slab.max_block_size = parse_number(ENV_SLAB_MAX_BLOCK, value)?;
        }
        if let Some(value) = lookup(ENV_SLAB_BLOCKS_PER_CHUNK) {
            self.slab.blocks_per_chunk = parse_number(ENV_SLAB_BLOCKS_PER_CHUNK, value)?;
        }
        if let Some(value) = lookup(ENV_SLAB_TRACK_LEAKS) {
            self.slab.track_leaks = parse_flag(ENV_SLAB_TRACK_LEAKS, value)?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.slab.validate()
    }

    /// Install as the process configuration
    ///
    /// Fixes the default locking policy and the global slab configuration.
    /// Must run before the first lock or slab allocation; fails with
    /// [`ConfigError::AlreadyInstalled`] otherwise, leaving both untouched.
    pub fn install(&self) -> Result<(), ConfigError> {
        self.validate()?;
        // Any lock fixes the policy implicitly, so it goes first and the
        // slab slot is checked before it
        ensure_slab_config_open()?;
        install_default_policy(self.sync.locking)?;
        install_slab_config(self.slab.clone())?;

        info!(
            locking = %self.sync.locking,
            max_block_size = self.slab.max_block_size,
            track_leaks = self.slab.track_leaks,
            "Kernel configuration installed"
        );
        Ok(())
    }
}

/// Start logging and install the configuration read from the environment
///
/// Meant for program entry points; see [`KernelConfig::from_env`] for the
/// variables read.
pub fn init_from_env() -> KernelResult<KernelConfig> {
    init_tracing();
    let config = KernelConfig::from_env()?;
    config.install()?;
    Ok(config)
}

fn parse_number(var: &'static str, value: String) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Environment { var, value })
}

fn parse_flag(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Environment { var, value }),
    }
}
