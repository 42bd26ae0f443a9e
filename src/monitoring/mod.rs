/*!
 * Monitoring
 * Structured logging setup and observability helpers
 */

mod tracer;

pub use tracer::{init_tracing, log_allocator_stats, LockWaitTimer, SLOW_LOCK_THRESHOLD};
