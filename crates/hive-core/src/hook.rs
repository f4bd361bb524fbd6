//! Deploy webhook: CI systems redeploy a service with a per-service key.
//!
//! The key travels as `Authorization: Bearer 1$<service>$<key>` or as
//! `Bearer <key>` with the service named separately, and must match a
//! non-empty `key.<key>` label on the service.
use hive_model::{ServiceLabel, ServiceSpec};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{context::Context, engine::EngineError};

const MIN_KEY_LEN: usize = 20;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("Authorization header missing")]
    MissingAuthorization,

    #[error("Authorization header must contain Bearer")]
    NotBearer,

    #[error("Bearer tokens must be at least 20 characters")]
    ShortKey,

    #[error("Specify the service using the hive-service header or ?service query param")]
    MissingService,

    #[error("Invalid authorization")]
    Unauthorized,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// What a hook call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HookReport {
    pub service: String,
    pub log: Vec<String>,
    pub errors: Vec<String>,
}

impl HookReport {
    pub fn message(&self) -> String {
        if self.log.is_empty() {
            "No changes".to_string()
        } else {
            self.log.join("\n")
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Handles deploy webhook calls.
#[derive(Clone, Debug)]
pub struct DeployHook {
    ctx: Context,
}

impl DeployHook {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Authenticate and force a redeploy, optionally switching the image.
    ///
    /// A rejected update is reported in [`HookReport::errors`], not as an error.
    #[instrument(level = "debug", skip(self, authorization))]
    pub async fn trigger(
        &self,
        authorization: Option<&str>,
        service: Option<&str>,
        image: Option<&str>,
    ) -> Result<HookReport, HookError> {
        let (embedded, key) = parse_authorization(authorization.ok_or(HookError::MissingAuthorization)?)?;
        let service = embedded
            .or(service)
            .filter(|s| !s.is_empty())
            .ok_or(HookError::MissingService)?;

        let engine = self.ctx.engine();
        let current = engine
            .inspect_service(service)
            .await?
            .ok_or(HookError::Unauthorized)?;
        if current.spec.label(&ServiceLabel::Key(key.to_string())).is_none() {
            warn!(service, "deploy hook key rejected");
            return Err(HookError::Unauthorized);
        }

        let mut report = HookReport {
            service: service.to_string(),
            ..Default::default()
        };
        let mut spec = current.spec.clone();
        force_update(&mut spec);
        if let Some(image) = image.filter(|i| !i.is_empty()) {
            deploy_image(&mut spec, image, &mut report.log);
        }

        match engine
            .update_service(&current.id, current.version.index, &spec)
            .await
        {
            Ok(()) => {
                info!(service, "deploy hook update applied");
                report.log.push("Service update successful".into());
            }
            Err(e) => {
                warn!(service, error = %e, "deploy hook update rejected");
                report.errors.push(e.message());
                report.log.push("Failed to update service".into());
            }
        }
        Ok(report)
    }
}

/// Split the header into the optional embedded service and the key.
fn parse_authorization(header: &str) -> Result<(Option<&str>, &str), HookError> {
    let token = header.strip_prefix("Bearer ").ok_or(HookError::NotBearer)?.trim();
    let (service, key) = match token.split('$').collect::<Vec<_>>().as_slice() {
        ["1", service, key] if !key.is_empty() => (Some(*service), *key),
        _ => (None, token),
    };
    if key.len() < MIN_KEY_LEN {
        return Err(HookError::ShortKey);
    }
    Ok((service, key))
}

fn force_update(spec: &mut ServiceSpec) {
    let task = spec.task_mut();
    task.force_update = Some(task.force_update.unwrap_or(0) + 1);
}

fn deploy_image(spec: &mut ServiceSpec, image: &str, log: &mut Vec<String>) {
    let labelled = spec.label(&ServiceLabel::DeployImage).map(str::to_string);
    if labelled.as_deref() != Some(image) {
        log.push(format!(
            "Labels.hive.deploy.image: {} => {image}",
            labelled.as_deref().unwrap_or("(none)")
        ));
    } else if spec.image() != Some(image) {
        log.push(format!(
            "TaskTemplate.ContainerSpec.Image: {} => {image}",
            spec.image().unwrap_or("(none)")
        ));
    }
    spec.set_label(&ServiceLabel::DeployImage, image);
    spec.container_mut().image = Some(image.to_string());
}
