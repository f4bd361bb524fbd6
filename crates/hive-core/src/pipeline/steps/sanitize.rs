use async_trait::async_trait;
use hive_model::{Mount, ServiceSpec};
use tracing::debug;

use crate::{
    context::Context,
    pipeline::{PipelineError, Step},
};

/// Drop the fragments the engine would reject or misinterpret.
pub struct SanitizeSpec;

#[async_trait]
impl Step for SanitizeSpec {
    fn name(&self) -> &'static str {
        "sanitize-spec"
    }

    fn required(&self) -> bool {
        true
    }

    async fn apply(&self, spec: &mut ServiceSpec, _ctx: &Context) -> Result<(), PipelineError> {
        spec.validate_name()
            .map_err(|e| PipelineError::Invalid(e.to_string()))?;

        if let Some(ports) = spec.endpoint_spec.as_mut().and_then(|e| e.ports.as_mut()) {
            let before = ports.len();
            ports.retain(|p| p.published_port.is_some());
            if ports.len() != before {
                debug!(service = %spec.name, dropped = before - ports.len(), "unpublished ports dropped");
            }
        }

        let Some(container) = spec
            .task_template
            .as_mut()
            .and_then(|t| t.container_spec.as_mut())
        else {
            return Ok(());
        };

        if let Some(env) = container.env.as_mut() {
            env.retain(|e| !e.trim().is_empty());
        }
        if let Some(mounts) = container.mounts.as_mut() {
            mounts.iter_mut().for_each(trim_paths);
            mounts.retain(is_well_formed);
        }
        Ok(())
    }
}

fn trim_paths(m: &mut Mount) {
    for path in [&mut m.source, &mut m.target].into_iter().flatten() {
        let trimmed = path.trim();
        if trimmed.len() != path.len() {
            *path = trimmed.to_string();
        }
    }
}

fn is_well_formed(m: &Mount) -> bool {
    let present = |p: &Option<String>| p.as_deref().is_some_and(|s| !s.is_empty());
    match m.kind.as_deref() {
        Some("bind") | Some("volume") => present(&m.source) && present(&m.target),
        _ => true,
    }
}
