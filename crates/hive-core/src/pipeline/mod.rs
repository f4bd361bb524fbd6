//! Ordered transformations applied to every service spec before it reaches the engine.
//!
//! A [`Pipeline`] holds its steps in registration order and runs them one after
//! another on the same mutable spec. Every step is idempotent, so running the
//! pipeline on its own output changes nothing.
//!
//! Steps that are not [`Step::required`] degrade: their errors are logged and
//! the run continues with the next step. A required step's error aborts the
//! run and nothing may be submitted.
mod error;
pub mod steps;

pub use error::PipelineError;

use std::sync::Arc;

use async_trait::async_trait;
use hive_model::{ServiceRequest, ServiceRequestKind, ServiceSpec};
use serde::Serialize;
use tracing::{debug, info, instrument, trace, warn};

use crate::{context::Context, metrics::StepOutcome};

/// One transformation of a service spec.
#[async_trait]
pub trait Step: Send + Sync {
    /// Stable name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// A failing required step fails the whole run.
    fn required(&self) -> bool {
        false
    }

    /// Gate on the spec's current shape. Skipped steps leave the spec untouched.
    fn applies(&self, _spec: &ServiceSpec) -> bool {
        true
    }

    async fn apply(&self, spec: &mut ServiceSpec, ctx: &Context) -> Result<(), PipelineError>;
}

/// Result of [`Pipeline::submit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Submitted {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Ordered list of [`Step`]s.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Arc<dyn Step>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// The six standard steps in their required order.
    pub fn standard() -> Self {
        let mut p = Self::new();
        p.register(Arc::new(steps::NetworkAssignment));
        p.register(Arc::new(steps::UpdateStrategy));
        p.register(Arc::new(steps::DeployDirective));
        p.register(Arc::new(steps::SanitizeSpec));
        p.register(Arc::new(steps::ReverseProxyLabels));
        p.register(Arc::new(steps::CompatibilityShim));
        p
    }

    /// Append a step. Steps run in registration order.
    pub fn register(&mut self, step: Arc<dyn Step>) {
        self.steps.push(step);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step on `spec` in order.
    #[instrument(level = "debug", skip_all, fields(service = %spec.name))]
    pub async fn run(&self, ctx: &Context, spec: &mut ServiceSpec) -> Result<(), PipelineError> {
        for step in &self.steps {
            let name = step.name();
            if !step.applies(spec) {
                trace!(step = name, "step skipped");
                ctx.metrics().record_step(name, StepOutcome::Skipped);
                continue;
            }

            match step.apply(spec, ctx).await {
                Ok(()) => {
                    debug!(step = name, "step applied");
                    ctx.metrics().record_step(name, StepOutcome::Applied);
                }
                Err(e) if step.required() => {
                    warn!(step = name, error = %e, "required step failed; aborting");
                    ctx.metrics().record_step(name, StepOutcome::Failed);
                    return Err(e);
                }
                Err(e) => {
                    warn!(step = name, error = %e, "step degraded");
                    ctx.metrics().record_step(name, StepOutcome::Degraded);
                }
            }
        }
        Ok(())
    }

    /// Run the pipeline on the request's spec and hand the result to the engine.
    ///
    /// The label store is reloaded first so the steps see configuration
    /// written by other clients. Nothing is sent when a required step fails.
    #[instrument(level = "debug", skip_all, fields(service = %request.spec.name, create = request.is_create()))]
    pub async fn submit(
        &self,
        ctx: &Context,
        request: ServiceRequest,
    ) -> Result<Submitted, PipelineError> {
        let ServiceRequest { kind, mut spec } = request;
        ctx.store().load().await;
        self.run(ctx, &mut spec).await?;

        match kind {
            ServiceRequestKind::Create => {
                let created = ctx.engine().create_service(&spec).await?;
                info!(service = %spec.name, id = %created.id, "service created");
                Ok(Submitted {
                    id: created.id,
                    warnings: created.warnings.unwrap_or_default(),
                })
            }
            ServiceRequestKind::Update { id, version } => {
                ctx.engine().update_service(&id, version, &spec).await?;
                info!(service = %spec.name, id = %id, "service updated");
                Ok(Submitted {
                    id,
                    warnings: Vec::new(),
                })
            }
        }
    }
}
