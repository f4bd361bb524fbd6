//! Metrics abstraction for the panel core.
//!
//! Backends (prometheus, ...) implement [`MetricsBackend`] and are injected through [`crate::context::Context`].
mod backend;
pub use backend::{BootstrapOutcome, MetricsBackend, MetricsHandle, StepOutcome, WriteOutcome};

mod noop;
pub use noop::NoOpMetrics;

use std::sync::Arc;

/// Create a no-op metrics handle.
#[inline]
pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}
