use std::sync::Arc;

use prometheus::{CounterVec, Encoder, Opts, Registry, TextEncoder, proto::MetricFamily};

use hive_core::metrics::{BootstrapOutcome, MetricsBackend, StepOutcome, WriteOutcome};

const NAMESPACE: &str = "hive";

/// Prometheus metrics backend for the panel core.
///
/// Implements [`MetricsBackend`]; every counter lives in the backend's
/// [`Registry`] and can be scraped through [`PrometheusMetrics::render`].
///
/// ## Metrics
/// - `hive_pipeline_steps_total{step, outcome}` - pipeline step runs
/// - `hive_label_writes_total{outcome}` - cluster label writes
/// - `hive_bootstrap_total{outcome}` - cluster bootstrap runs
///
/// ## Label cardinality
/// All labels are bounded:
/// - `step`: the names of the registered pipeline steps
/// - `outcome`: the `as_label()` values of the core outcome enums
#[derive(Clone)]
pub struct PrometheusMetrics {
    pipeline_steps: CounterVec,
    label_writes: CounterVec,
    bootstrap: CounterVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Create a backend registering its counters in `registry`.
    ///
    /// # Errors
    /// Fails when `registry` already holds counters with the same names.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use hive_prometheus::{PrometheusMetrics, Registry};
    ///
    /// let registry = Arc::new(Registry::new());
    /// let metrics = PrometheusMetrics::new_with_registry(registry.clone()).unwrap();
    /// assert!(Arc::ptr_eq(metrics.registry(), &registry));
    /// assert!(PrometheusMetrics::new_with_registry(registry).is_err());
    /// ```
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let pipeline_steps = CounterVec::new(
            Opts::new("pipeline_steps_total", "Pipeline step runs by outcome").namespace(NAMESPACE),
            &["step", "outcome"],
        )?;
        registry.register(Box::new(pipeline_steps.clone()))?;

        let label_writes = CounterVec::new(
            Opts::new("label_writes_total", "Cluster label writes by outcome").namespace(NAMESPACE),
            &["outcome"],
        )?;
        registry.register(Box::new(label_writes.clone()))?;

        let bootstrap = CounterVec::new(
            Opts::new("bootstrap_total", "Cluster bootstrap runs by outcome").namespace(NAMESPACE),
            &["outcome"],
        )?;
        registry.register(Box::new(bootstrap.clone()))?;

        Ok(Self {
            pipeline_steps,
            label_writes,
            bootstrap,
            registry,
        })
    }

    /// Create a backend with its own registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    /// Snapshot of every metric family in the registry.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Everything gathered, in the Prometheus text exposition format.
    ///
    /// # Examples
    /// ```
    /// use hive_core::metrics::{MetricsBackend, WriteOutcome};
    /// use hive_prometheus::PrometheusMetrics;
    ///
    /// let metrics = PrometheusMetrics::new().unwrap();
    /// metrics.record_label_write(WriteOutcome::Conflict);
    /// let body = metrics.render().unwrap();
    /// assert!(body.contains(r#"hive_label_writes_total{outcome="conflict"} 1"#));
    /// ```
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Content type matching [`PrometheusMetrics::render`].
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    /// Registry the counters are registered in.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_step(&self, step: &str, outcome: StepOutcome) {
        self.pipeline_steps
            .with_label_values(&[step, outcome.as_label()])
            .inc();
    }

    fn record_label_write(&self, outcome: WriteOutcome) {
        self.label_writes
            .with_label_values(&[outcome.as_label()])
            .inc();
    }

    fn record_bootstrap(&self, outcome: BootstrapOutcome) {
        self.bootstrap.with_label_values(&[outcome.as_label()]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
        families
            .iter()
            .find(|f| f.name() == name)
            .unwrap_or_else(|| panic!("{name} not found"))
    }

    #[test]
    fn can_create_prometheus_metrics() {
        let _metrics = PrometheusMetrics::new().expect("failed to create metrics");
    }

    #[test]
    fn step_outcomes_are_counted_per_label_pair() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_step("sanitize-spec", StepOutcome::Applied);
        metrics.record_step("sanitize-spec", StepOutcome::Applied);
        metrics.record_step("network-assignment", StepOutcome::Degraded);

        let families = metrics.gather();
        let steps = family(&families, "hive_pipeline_steps_total");
        assert_eq!(steps.get_metric().len(), 2);
        assert_eq!(
            metrics
                .pipeline_steps
                .with_label_values(&["sanitize-spec", "applied"])
                .get(),
            2.0
        );
    }

    #[test]
    fn label_writes_and_bootstrap_are_counted() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_label_write(WriteOutcome::Persisted);
        metrics.record_label_write(WriteOutcome::Conflict);
        metrics.record_bootstrap(BootstrapOutcome::Partial);

        let families = metrics.gather();
        assert_eq!(family(&families, "hive_label_writes_total").get_metric().len(), 2);
        assert_eq!(family(&families, "hive_bootstrap_total").get_metric().len(), 1);
    }

    #[test]
    fn render_produces_text_exposition() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_bootstrap(BootstrapOutcome::Ready);

        let text = metrics.render().unwrap();
        assert!(text.contains("hive_bootstrap_total{outcome=\"ready\"} 1"));
        assert!(metrics.content_type().starts_with("text/plain"));
    }

    #[test]
    fn can_use_custom_registry() {
        let registry = Arc::new(Registry::new());
        let metrics = PrometheusMetrics::new_with_registry(registry.clone()).unwrap();

        metrics.record_label_write(WriteOutcome::Buffered);
        assert!(!registry.gather().is_empty());
    }
}
