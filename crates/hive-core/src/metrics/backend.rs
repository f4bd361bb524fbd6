use std::sync::Arc;

/// Result of running one pipeline step on one spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step changed or confirmed the spec.
    Applied,
    /// The step's predicate did not match.
    Skipped,
    /// The step failed and the pipeline carried on without it.
    Degraded,
    /// The step failed and aborted the pipeline.
    Failed,
}

impl StepOutcome {
    /// Value of the `outcome` metric label.
    ///
    /// # Examples
    /// ```
    /// use hive_core::metrics::StepOutcome;
    ///
    /// assert_eq!(StepOutcome::Degraded.as_label(), "degraded");
    /// ```
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            StepOutcome::Applied => "applied",
            StepOutcome::Skipped => "skipped",
            StepOutcome::Degraded => "degraded",
            StepOutcome::Failed => "failed",
        }
    }
}

/// Fate of a label write against the cluster object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Accepted by the engine.
    Persisted,
    /// No cluster yet; kept in the pre-cluster buffer.
    Buffered,
    /// Rejected because the version was stale. The write is dropped.
    Conflict,
    /// Any other engine failure. The write is dropped.
    Failed,
}

impl WriteOutcome {
    /// Value of the `outcome` metric label.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            WriteOutcome::Persisted => "persisted",
            WriteOutcome::Buffered => "buffered",
            WriteOutcome::Conflict => "conflict",
            WriteOutcome::Failed => "failed",
        }
    }
}

/// Final result of one bootstrap invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Cluster initialized and buffered configuration migrated.
    Ready,
    /// Cluster initialized, configuration not migrated yet.
    Partial,
    /// Nothing to do; the cluster was ready before the run.
    AlreadyReady,
    /// The init call failed.
    Failed,
}

impl BootstrapOutcome {
    /// Value of the `outcome` metric label.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            BootstrapOutcome::Ready => "ready",
            BootstrapOutcome::Partial => "partial",
            BootstrapOutcome::AlreadyReady => "already_ready",
            BootstrapOutcome::Failed => "failed",
        }
    }
}

/// Backend metrics collection interface.
///
/// Implementations must be cheap and non-blocking: they are called from the
/// request path and from background label writes.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Record the outcome of a pipeline step.
    fn record_step(&self, step: &str, outcome: StepOutcome);
    /// Record what happened to a label write.
    fn record_label_write(&self, outcome: WriteOutcome);
    /// Record the end of a bootstrap invocation.
    fn record_bootstrap(&self, outcome: BootstrapOutcome);
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
