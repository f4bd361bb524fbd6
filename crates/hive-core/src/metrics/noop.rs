use crate::metrics::backend::{BootstrapOutcome, MetricsBackend, StepOutcome, WriteOutcome};

/// Metrics backend that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_step(&self, _: &str, _: StepOutcome) {}

    #[inline(always)]
    fn record_label_write(&self, _: WriteOutcome) {}

    #[inline(always)]
    fn record_bootstrap(&self, _: BootstrapOutcome) {}
}
