use async_trait::async_trait;
use hive_model::{HealthCheck, ServiceLabel, ServiceSpec, UpdateConfig, UpdateOrder};

use crate::{
    context::Context,
    pipeline::{PipelineError, Step},
};

const DELAY_NS: u64 = 5_000_000_000;

/// Readiness probes for images recognised by prefix.
const PROBES: &[(&[&str], &str)] = &[
    (&["postgres"], "pg_isready -U postgres"),
    (&["thgh/hivepanel"], "curl -f http://localhost:80/ || exit 1"),
    (&["redis"], "redis-cli ping"),
    (&["mysql", "mariadb"], "mysqladmin ping"),
];

/// Turn the `update` label into a rolling-update policy.
pub struct UpdateStrategy;

#[async_trait]
impl Step for UpdateStrategy {
    fn name(&self) -> &'static str {
        "update-strategy"
    }

    fn applies(&self, spec: &ServiceSpec) -> bool {
        spec.label(&ServiceLabel::Update).is_some()
    }

    async fn apply(&self, spec: &mut ServiceSpec, _ctx: &Context) -> Result<(), PipelineError> {
        let raw = spec.label(&ServiceLabel::Update).unwrap_or_default();
        let order: UpdateOrder = raw
            .parse()
            .map_err(|e: hive_model::ModelError| PipelineError::Invalid(e.to_string()))?;

        let cfg = spec.update_config.get_or_insert_with(UpdateConfig::default);
        cfg.delay = Some(DELAY_NS);
        cfg.order = Some(order);
        cfg.parallelism = Some(match order {
            UpdateOrder::StartFirst => 1,
            UpdateOrder::StopFirst => 3,
        });

        if order == UpdateOrder::StartFirst {
            inject_health_check(spec);
        }
        Ok(())
    }
}

/// Best effort; an existing health check is never replaced.
///
/// The deploy label names the image the service is about to run and wins over
/// the current one.
fn inject_health_check(spec: &mut ServiceSpec) {
    let Some(cmd) = spec
        .label(&ServiceLabel::DeployImage)
        .or_else(|| spec.image())
        .and_then(probe_for)
    else {
        return;
    };
    let container = spec.container_mut();
    if container.health_check.is_none() {
        container.health_check = Some(HealthCheck::shell(cmd));
    }
}

fn probe_for(image: &str) -> Option<&'static str> {
    PROBES
        .iter()
        .find(|(prefixes, _)| prefixes.iter().any(|p| image.starts_with(p)))
        .map(|(_, cmd)| *cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEngine;
    use std::sync::Arc;

    fn ctx() -> Context {
        Context::with_engine(Arc::new(FakeEngine::new()))
    }

    fn spec(image: &str, update: &str) -> ServiceSpec {
        let mut s = ServiceSpec::named("db").with_label(&ServiceLabel::Update, update);
        s.container_mut().image = Some(image.into());
        s
    }

    #[tokio::test]
    async fn start_first_on_postgres_gets_a_readiness_probe() {
        let mut s = spec("postgres:15", "start-first");
        UpdateStrategy.apply(&mut s, &ctx()).await.unwrap();

        let cfg = s.update_config.as_ref().unwrap();
        assert_eq!(cfg.order, Some(UpdateOrder::StartFirst));
        assert_eq!(cfg.parallelism, Some(1));
        assert_eq!(cfg.delay, Some(DELAY_NS));

        let hc = s.container().unwrap().health_check.as_ref().unwrap();
        assert_eq!(hc.test, vec!["CMD-SHELL", "pg_isready -U postgres"]);
    }

    #[tokio::test]
    async fn stop_first_uses_wider_parallelism_and_no_probe() {
        let mut s = spec("postgres:15", "stop-first");
        UpdateStrategy.apply(&mut s, &ctx()).await.unwrap();

        assert_eq!(s.update_config.as_ref().unwrap().parallelism, Some(3));
        assert!(s.container().unwrap().health_check.is_none());
    }

    #[tokio::test]
    async fn existing_health_check_is_kept() {
        let mut s = spec("redis:7", "start-first");
        s.container_mut().health_check = Some(HealthCheck::shell("true"));
        UpdateStrategy.apply(&mut s, &ctx()).await.unwrap();

        let hc = s.container().unwrap().health_check.as_ref().unwrap();
        assert_eq!(hc.test[1], "true");
    }

    #[tokio::test]
    async fn deploy_label_selects_the_probe() {
        let mut s = ServiceSpec::named("db")
            .with_label(&ServiceLabel::Update, "start-first")
            .with_label(&ServiceLabel::DeployImage, "redis:7");
        UpdateStrategy.apply(&mut s, &ctx()).await.unwrap();

        let hc = s.container().unwrap().health_check.as_ref().unwrap();
        assert_eq!(hc.test[1], "redis-cli ping");
    }

    #[tokio::test]
    async fn unknown_value_is_an_error() {
        let mut s = spec("nginx", "sideways");
        assert!(UpdateStrategy.apply(&mut s, &ctx()).await.is_err());
        assert!(s.update_config.is_none());
    }

    #[test]
    fn probes_match_by_prefix() {
        assert_eq!(probe_for("mariadb:11"), Some("mysqladmin ping"));
        assert_eq!(probe_for("thgh/hivepanel:latest"), Some("curl -f http://localhost:80/ || exit 1"));
        assert_eq!(probe_for("nginx"), None);
    }
}
