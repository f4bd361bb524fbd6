//! Prometheus metrics backend for the hive panel.
//!
//! [`PrometheusMetrics`] implements [`hive_core::metrics::MetricsBackend`] and
//! keeps its counters in a prometheus [`Registry`].
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use hive_core::{prelude::*, testing::FakeEngine};
//! use hive_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let ctx = Context::new(
//!     Arc::new(FakeEngine::new()),
//!     PanelConfig::default(),
//!     Arc::new(metrics.clone()),
//! );
//! # let _ = ctx;
//! let body = metrics.render()?;
//! # let _ = body;
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `hive_pipeline_steps_total{step, outcome}` - Counter
//! - `hive_label_writes_total{outcome}` - Counter
//! - `hive_bootstrap_total{outcome}` - Counter
//!
//! Serving `/metrics` is left to the daemon's HTTP router.

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
