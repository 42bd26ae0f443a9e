/*!
 * Slab Configuration
 * Size-class range, chunk geometry and leak tracking
 */

use crate::core::errors::ConfigError;
use crate::core::types::{Size, DEFAULT_MAX_BLOCK_SIZE, MAX_BLOCKS_PER_CHUNK};
use serde::{Deserialize, Serialize};

/// Slab allocator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlabConfig {
    /// Requests up to this many bytes are served from size classes
    pub max_block_size: Size,
    /// Blocks carved out of every new chunk
    pub blocks_per_chunk: usize,
    /// Record every live allocation for leak reports
    pub track_leaks: bool,
}

impl Default for SlabConfig {
    fn default() -> Self {
        Self {
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            blocks_per_chunk: MAX_BLOCKS_PER_CHUNK,
            track_leaks: cfg!(any(debug_assertions, feature = "leak-tracking")),
        }
    }
}

impl SlabConfig {
    /// Configuration for allocation-heavy workloads: no bookkeeping beyond counters
    pub fn lean() -> Self {
        Self {
            track_leaks: false,
            ..Self::default()
        }
    }

    /// Builder-style leak tracking toggle
    pub fn with_leak_tracking(mut self, enabled: bool) -> Self {
        self.track_leaks = enabled;
        self
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_block_size == 0 {
            return Err(ConfigError::Invalid {
                field: "max_block_size",
                reason: "must be at least 1".into(),
            });
        }
        if self.blocks_per_chunk == 0 || self.blocks_per_chunk > MAX_BLOCKS_PER_CHUNK {
            return Err(ConfigError::Invalid {
                field: "blocks_per_chunk",
                reason: format!("must be within 1..={}", MAX_BLOCKS_PER_CHUNK),
            });
        }
        Ok(())
    }
}
