use async_trait::async_trait;
use hive_model::{
    EndpointSpec, LEGACY_CONTROL_NETWORK, LEGACY_CONTROL_SERVICE, Mount, NetworkAttachment,
    NetworkCreate, PortConfig, ServiceSpec,
};
use tracing::{debug, warn};

use crate::{
    context::Context,
    pipeline::{PipelineError, Step},
};

const IMAGE: &str = "caprover/caprover";
const EDGE_IMAGE: &str = "caprover/caprover-edge";
const DATA_DIR: &str = "/captain";
const BASE_DIR_ENV: &str = "CAPTAIN_BASE_DIRECTORY";
const DOCKER_SOCK: &str = "/var/run/docker.sock";
const CONTROL_PORT: u16 = 3000;

/// Bring a legacy control service's spec up to what its image expects, so an
/// existing installation can be taken over in place with its data directory.
pub struct CompatibilityShim;

#[async_trait]
impl Step for CompatibilityShim {
    fn name(&self) -> &'static str {
        "compatibility-shim"
    }

    fn applies(&self, spec: &ServiceSpec) -> bool {
        spec.name == LEGACY_CONTROL_SERVICE
    }

    async fn apply(&self, spec: &mut ServiceSpec, ctx: &Context) -> Result<(), PipelineError> {
        rewrite(spec);

        match ctx
            .engine()
            .create_network(&NetworkCreate::overlay(LEGACY_CONTROL_NETWORK))
            .await
        {
            Ok(()) => debug!(network = LEGACY_CONTROL_NETWORK, "legacy network created"),
            Err(e) if e.is_already_exists() => {}
            Err(e) => warn!(network = LEGACY_CONTROL_NETWORK, error = %e, "legacy network not created"),
        }
        Ok(())
    }
}

fn rewrite(spec: &mut ServiceSpec) {
    let c = spec.container_mut();
    let base_dir = c.env_value(BASE_DIR_ENV).map(str::to_string);

    if c.image.as_deref().is_none_or(str::is_empty) {
        c.image = Some(IMAGE.to_string());
    }
    if base_dir.is_some() {
        c.image = Some(EDGE_IMAGE.to_string());
    }

    let env = c.env.get_or_insert_with(Vec::new);
    for (name, value) in [("IS_CAPTAIN_INSTANCE", "1"), ("ACCEPTED_TERMS", "true")] {
        if !env.iter().any(|e| e.starts_with(&format!("{name}="))) {
            env.push(format!("{name}={value}"));
        }
    }

    let mut wanted = vec![Mount::bind(DOCKER_SOCK, DOCKER_SOCK)];
    if let Some(dir) = &base_dir {
        wanted.push(Mount::bind(dir, dir));
    }
    wanted.push(Mount::bind(base_dir.as_deref().unwrap_or(DATA_DIR), DATA_DIR));
    for m in wanted {
        let target = m.target.clone().unwrap_or_default();
        if !c.has_mount_target(&target) {
            c.mounts.get_or_insert_with(Vec::new).push(m);
        }
    }

    let networks = spec.task_mut().networks.get_or_insert_with(Vec::new);
    if !networks.iter().any(|n| n.target == LEGACY_CONTROL_NETWORK) {
        networks.push(NetworkAttachment::new(LEGACY_CONTROL_NETWORK));
    }

    let ports = spec
        .endpoint_spec
        .get_or_insert_with(EndpointSpec::default)
        .ports
        .get_or_insert_with(Vec::new);
    if !ports.iter().any(|p| p.target_port == Some(CONTROL_PORT)) {
        ports.push(PortConfig::host_tcp(CONTROL_PORT, CONTROL_PORT));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEngine;
    use std::sync::Arc;

    fn targets(spec: &ServiceSpec) -> Vec<String> {
        spec.container()
            .and_then(|c| c.mounts.as_ref())
            .map(|m| m.iter().filter_map(|m| m.target.clone()).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn legacy_service_gets_what_it_needs() {
        let engine = Arc::new(FakeEngine::new());
        let ctx = Context::with_engine(engine.clone());
        let mut spec = ServiceSpec::named(LEGACY_CONTROL_SERVICE);

        CompatibilityShim.apply(&mut spec, &ctx).await.unwrap();

        assert_eq!(spec.image(), Some(IMAGE));
        assert_eq!(targets(&spec), vec![DOCKER_SOCK, DATA_DIR]);
        let c = spec.container().unwrap();
        assert_eq!(c.env_value("ACCEPTED_TERMS"), Some("true"));
        assert_eq!(c.env_value("IS_CAPTAIN_INSTANCE"), Some("1"));

        let ports = spec.endpoint_spec.as_ref().unwrap().ports.as_ref().unwrap();
        assert_eq!(ports.len(), 1);
        assert!(ports[0].is_host_mode());
        assert!(engine.network_names().contains(&LEGACY_CONTROL_NETWORK.to_string()));

        let once = spec.clone();
        CompatibilityShim.apply(&mut spec, &ctx).await.unwrap();
        assert_eq!(spec, once);
    }

    #[test]
    fn base_directory_switches_to_edge_image() {
        let mut spec = ServiceSpec::named(LEGACY_CONTROL_SERVICE);
        let c = spec.container_mut();
        c.image = Some(IMAGE.into());
        c.env = Some(vec![format!("{BASE_DIR_ENV}=/srv/captain")]);

        rewrite(&mut spec);

        assert_eq!(spec.image(), Some(EDGE_IMAGE));
        assert_eq!(targets(&spec), vec![DOCKER_SOCK, "/srv/captain", DATA_DIR]);
        let data = spec.container().unwrap().mounts.as_ref().unwrap()[2].clone();
        assert_eq!(data.source.as_deref(), Some("/srv/captain"));
    }

    #[test]
    fn other_services_are_untouched() {
        assert!(!CompatibilityShim.applies(&ServiceSpec::named("web")));
    }
}
