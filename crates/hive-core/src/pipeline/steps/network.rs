use async_trait::async_trait;
use hive_model::{
    DEFAULT_NETWORK, INGRESS_NETWORK, NetworkAttachment, NetworkCreate, ServiceSpec, SwarmLabel,
};
use tracing::{info, warn};

use crate::{
    context::Context,
    engine::EngineError,
    pipeline::{PipelineError, Step},
};

/// Attach the service to the panel's default overlay network.
///
/// Always leaves a task template behind, even when no network can be chosen.
pub struct NetworkAssignment;

#[async_trait]
impl Step for NetworkAssignment {
    fn name(&self) -> &'static str {
        "network-assignment"
    }

    fn applies(&self, spec: &ServiceSpec) -> bool {
        !spec.has_networks()
    }

    async fn apply(&self, spec: &mut ServiceSpec, ctx: &Context) -> Result<(), PipelineError> {
        let task = spec.task_mut();
        if let Some(target) = default_network(ctx).await? {
            task.networks = Some(vec![NetworkAttachment::new(target)]);
        }
        Ok(())
    }
}

/// Resolve the overlay network services should join.
///
/// Order: the stored choice; the only non-ingress overlay when exactly two
/// exist; a freshly created default network when fewer than two exist. With
/// more candidates there is no safe guess and `None` is returned.
pub(crate) async fn default_network(ctx: &Context) -> Result<Option<String>, EngineError> {
    if let Some(name) = ctx.store().get(&SwarmLabel::NetworkDefault) {
        return Ok(Some(name));
    }

    let mut overlays: Vec<String> = ctx
        .engine()
        .list_networks()
        .await?
        .into_iter()
        .filter(|n| n.is_swarm_overlay())
        .map(|n| n.name)
        .collect();
    overlays.sort();

    match overlays.len() {
        0 | 1 => {
            match ctx
                .engine()
                .create_network(&NetworkCreate::overlay(DEFAULT_NETWORK))
                .await
            {
                Ok(()) => info!(network = DEFAULT_NETWORK, "created default network"),
                Err(e) if e.is_already_exists() => {}
                Err(e) => return Err(e),
            }
            ctx.store().set(&SwarmLabel::NetworkDefault, DEFAULT_NETWORK);
            Ok(Some(DEFAULT_NETWORK.to_string()))
        }
        2 if overlays.iter().any(|n| n == INGRESS_NETWORK) => {
            Ok(overlays.into_iter().find(|n| n != INGRESS_NETWORK))
        }
        _ => {
            warn!(candidates = ?overlays, "multiple overlay networks; leaving network unset");
            Ok(None)
        }
    }
}
