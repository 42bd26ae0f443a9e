/*!
 * Structured Tracing
 * Subscriber setup and timing helpers using the tracing crate
 *
 * Features:
 * - Environment-driven filtering (RUST_LOG)
 * - JSON-formatted logs for structured parsing
 * - Slow lock acquisition warnings
 * - Allocator statistics snapshots
 */

use crate::memory::AllocatorStats;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Lock waits longer than this are reported
pub const SLOW_LOCK_THRESHOLD: Duration = Duration::from_millis(10);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - KERNEL_TRACE_JSON: Enable JSON output (default: false)
///
/// Returns `false` when a global subscriber was already installed, so it is
/// safe to call from every test or binary entry point.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Check if JSON output is requested
    let use_json = std::env::var("KERNEL_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        // JSON output for production/parsing
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        // Human-readable output for development
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .with_file(true)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "Structured tracing initialized");
    }
    installed
}

/// Measures how long a lock acquisition waited
pub struct LockWaitTimer {
    start: Instant,
    kind: &'static str,
}

impl LockWaitTimer {
    #[inline]
    pub fn start(kind: &'static str) -> Self {
        Self {
            start: Instant::now(),
            kind,
        }
    }

    /// Report the wait if it was slow; returns when the lock was acquired
    pub fn finish(self) -> Instant {
        let waited = self.start.elapsed();
        if waited > SLOW_LOCK_THRESHOLD {
            warn!(
                lock = self.kind,
                waited_ms = waited.as_millis() as u64,
                slow = true,
                "slow lock acquisition"
            );
        }
        self.start + waited
    }
}

/// Emit one structured event describing the allocator
pub fn log_allocator_stats(stats: &AllocatorStats) {
    info!(
        pooled_allocations = stats.pooled_allocations,
        pooled_deallocations = stats.pooled_deallocations,
        heap_allocations = stats.heap_allocations,
        heap_deallocations = stats.heap_deallocations,
        live_pooled_blocks = stats.live_pooled_blocks,
        chunk_count = stats.chunk_count,
        reserved_bytes = stats.reserved_bytes,
        outstanding = stats.outstanding(),
        "Slab allocator statistics"
    );
    if stats.outstanding() == 0 {
        debug!("No outstanding slab allocations");
    }
}
