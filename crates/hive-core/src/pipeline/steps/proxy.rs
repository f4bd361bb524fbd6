use async_trait::async_trait;
use hive_model::{
    DEFAULT_NETWORK, EndpointSpec, Mount, NetworkAttachment, PortConfig, ProxyConvention,
    ServiceLabel, ServiceSpec, SwarmLabel,
};
use tracing::{debug, info, warn};

use crate::{
    context::Context,
    pipeline::{PipelineError, Step, steps::network::default_network},
};

const PROXY_SERVICE: &str = "hive-caddy";
const PROXY_VOLUME: &str = "hive_caddy";
const PROXY_IMAGE: &str = "lucaslorentz/caddy-docker-proxy:2.8";
const DOCKER_SOCK: &str = "/var/run/docker.sock";
const CUSTOM_PROXY: &str = "custom";

const CADDY: &str = "caddy";
const CADDY_UPSTREAM: &str = "caddy.reverse_proxy";

/// Route the service's hostnames through the reverse proxy.
///
/// With the caddy convention the proxy service itself is provisioned on first
/// use. Provisioning converges: a proxy created concurrently by another
/// request counts as success.
pub struct ReverseProxyLabels;

#[async_trait]
impl Step for ReverseProxyLabels {
    fn name(&self) -> &'static str {
        "reverse-proxy-labels"
    }

    fn applies(&self, spec: &ServiceSpec) -> bool {
        spec.label(&ServiceLabel::Hostnames).is_some()
            && spec.label(&ServiceLabel::ProxyOverride) != Some(CUSTOM_PROXY)
    }

    async fn apply(&self, spec: &mut ServiceSpec, ctx: &Context) -> Result<(), PipelineError> {
        let hosts = split_hostnames(spec.label(&ServiceLabel::Hostnames).unwrap_or_default());
        let port = spec.label(&ServiceLabel::Port).map(str::to_string);

        match ctx.config().proxy {
            ProxyConvention::Caddy => {
                caddy_labels(spec, &hosts, port.as_deref());
                ensure_caddy(spec, ctx).await
            }
            ProxyConvention::Traefik => {
                traefik_labels(spec, &hosts, port.as_deref(), ctx.config().root_domain.as_deref());
                Ok(())
            }
        }
    }
}

/// Split a hostname list on commas, semicolons and newlines.
pub fn split_hostnames(raw: &str) -> Vec<String> {
    raw.split([',', ';', '\n'])
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}

fn caddy_labels(spec: &mut ServiceSpec, hosts: &[String], port: Option<&str>) {
    let sites = hosts
        .iter()
        .map(|h| {
            if h.ends_with("localhost") || h.ends_with("traefik.me") {
                format!("http://{h}")
            } else {
                h.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    let upstream = match port {
        Some(p) => format!("{{{{upstreams {p}}}}}"),
        None => "{{upstreams}}".to_string(),
    };
    spec.labels.insert(CADDY, sites).insert(CADDY_UPSTREAM, upstream);
}

/// Generated router labels never replace labels the user set.
fn traefik_labels(spec: &mut ServiceSpec, hosts: &[String], port: Option<&str>, root: Option<&str>) {
    let name = spec.name.clone();
    let rule = hosts
        .iter()
        .map(|h| {
            let h = match root {
                Some(root) => h.replace(".*", &format!(".{root}")),
                None => h.clone(),
            };
            format!("Host(`{h}`)")
        })
        .collect::<Vec<_>>()
        .join(" || ");
    let network = spec
        .task_template
        .as_ref()
        .and_then(|t| t.networks.as_ref())
        .and_then(|n| n.first())
        .map_or_else(|| DEFAULT_NETWORK.to_string(), |a| a.target.clone());

    let generated = [
        ("traefik.enable".to_string(), "true".to_string()),
        ("traefik.docker.network".to_string(), network),
        (format!("traefik.http.routers.{name}.rule"), rule),
        (format!("traefik.http.routers.{name}.entrypoints"), "http".to_string()),
        (format!("traefik.http.routers.{name}.service"), name.clone()),
        (
            format!("traefik.http.services.{name}.loadbalancer.server.port"),
            port.unwrap_or("80").to_string(),
        ),
    ];
    for (k, v) in generated {
        if spec.labels.get(&k).is_none() {
            spec.labels.insert(k, v);
        }
    }
}

async fn ensure_caddy(spec: &ServiceSpec, ctx: &Context) -> Result<(), PipelineError> {
    let store = ctx.store();
    let engine = ctx.engine();

    if let Some(recorded) = store.get(&SwarmLabel::ProxyService) {
        if engine.inspect_service(&recorded).await?.is_some() {
            return Ok(());
        }
        warn!(service = %recorded, "recorded proxy service is gone");
        store.set(&SwarmLabel::ProxyService, "");
    }

    if engine.inspect_service(PROXY_SERVICE).await?.is_some() {
        debug!(service = PROXY_SERVICE, "adopting existing proxy service");
        store.set_all([
            (SwarmLabel::ProxyService, PROXY_SERVICE),
            (SwarmLabel::ProxyVolume, PROXY_VOLUME),
        ]);
        return Ok(());
    }

    let busy: Vec<u16> = engine
        .list_services()
        .await?
        .iter()
        .filter(|s| s.spec.name != PROXY_SERVICE)
        .flat_map(|s| s.host_ports().collect::<Vec<_>>())
        .filter(|p| matches!(p, 80 | 443))
        .collect();
    if !busy.is_empty() {
        warn!(ports = ?busy, service = %spec.name, "host ports taken; not provisioning the proxy");
        return Ok(());
    }

    let network = match spec
        .task_template
        .as_ref()
        .and_then(|t| t.networks.as_ref())
        .and_then(|n| n.first())
    {
        Some(a) => a.target.clone(),
        None => match default_network(ctx).await? {
            Some(n) => n,
            None => {
                warn!("no overlay network to attach the proxy to; not provisioning");
                return Ok(());
            }
        },
    };

    store.set_all([
        (SwarmLabel::ProxyService, PROXY_SERVICE),
        (SwarmLabel::ProxyVolume, PROXY_VOLUME),
    ]);
    match engine.create_service(&caddy_service(&network)).await {
        Ok(created) => info!(id = %created.id, network = %network, "proxy service provisioned"),
        Err(e) if e.is_already_exists() => debug!("proxy service provisioned concurrently"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn caddy_service(network: &str) -> ServiceSpec {
    let mut spec = ServiceSpec::named(PROXY_SERVICE);
    spec.task_mut().networks = Some(vec![NetworkAttachment::new(network)]);

    let c = spec.container_mut();
    c.image = Some(PROXY_IMAGE.to_string());
    c.mounts = Some(vec![
        Mount::bind(DOCKER_SOCK, DOCKER_SOCK),
        Mount::volume(PROXY_VOLUME, "/data"),
    ]);
    c.env = Some(vec![format!("CADDY_INGRESS_NETWORKS={network}")]);

    spec.endpoint_spec = Some(EndpointSpec {
        ports: Some(vec![PortConfig::host_tcp(80, 80), PortConfig::host_tcp(443, 443)]),
        ..Default::default()
    });
    spec
}
