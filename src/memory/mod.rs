/*!
 * Memory Module
 * Slab allocation for small objects
 */

pub mod config;
pub mod slab;
pub mod slab_box;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use config::SlabConfig;
pub use slab::{global, install_slab_config, report_global_leaks, SlabAllocator};
pub use slab_box::SlabBox;
pub use traits::*;
pub use types::*;
