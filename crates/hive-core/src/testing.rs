//! In-memory engine for tests.
//!
//! [`FakeEngine`] keeps a cluster object with a version counter, networks and
//! services keyed by name, and records builds and init calls. Every call yields
//! once before touching state so concurrent callers interleave the way they
//! would against a real engine.
use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use hive_model::{
    ClusterObject, Endpoint, ImageSummary, NetworkCreate, NetworkSummary, ObjectVersion, Service,
    ServiceCreated, ServiceSpec, SwarmInitRequest, SwarmSpec,
};
use parking_lot::Mutex;

use crate::engine::{Engine, EngineError, EngineResult};

/// Node id returned by a successful init.
pub const FAKE_NODE_ID: &str = "k3x9tq0v2m8wz4p7r1n6c5b2d";

#[derive(Default)]
struct FakeState {
    reachable: bool,
    swarm_hidden: bool,
    index: u64,
    cluster: Option<ClusterObject>,
    networks: Vec<NetworkSummary>,
    services: BTreeMap<String, Service>,
    builds: Vec<(String, Vec<u8>)>,
    images: Vec<ImageSummary>,
    build_error: Option<String>,
    init_script: VecDeque<EngineResult<String>>,
    init_calls: Vec<SwarmInitRequest>,
    network_creates: usize,
    service_creates: usize,
}

impl FakeState {
    fn next_index(&mut self) -> u64 {
        self.index += 1;
        self.index
    }

    fn check(&self) -> EngineResult<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(EngineError::Unreachable("connection refused".into()))
        }
    }
}

pub struct FakeEngine {
    state: Mutex<FakeState>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeEngine {
    /// Reachable engine, not part of any cluster, with the `ingress` network only.
    pub fn new() -> Self {
        let state = FakeState {
            reachable: true,
            index: 10,
            networks: vec![overlay("ingress")],
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    /// Engine that already manages an (unlabelled) cluster.
    pub fn with_cluster() -> Self {
        let engine = Self::new();
        engine.seed_cluster(std::iter::empty::<(&str, &str)>());
        engine
    }

    /// Create (or replace) the cluster object with the given labels.
    pub fn seed_cluster<I, K, V>(&self, labels: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut st = self.state.lock();
        let index = st.next_index();
        st.cluster = Some(ClusterObject {
            id: "cluster-0".into(),
            version: ObjectVersion { index },
            spec: SwarmSpec {
                name: Some("default".into()),
                labels: labels.into_iter().collect(),
                ..Default::default()
            },
            ..Default::default()
        });
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().reachable = reachable;
    }

    /// Make swarm inspect calls fail as if the manager were still starting.
    pub fn hide_swarm(&self, hidden: bool) {
        self.state.lock().swarm_hidden = hidden;
    }

    /// Simulate a write by another client.
    pub fn bump_cluster_version(&self) {
        let mut st = self.state.lock();
        let index = st.next_index();
        if let Some(c) = st.cluster.as_mut() {
            c.version.index = index;
        }
    }

    pub fn cluster_label(&self, key: &str) -> Option<String> {
        let st = self.state.lock();
        st.cluster.as_ref()?.spec.labels.get(key).map(str::to_string)
    }

    pub fn cluster_version(&self) -> u64 {
        let st = self.state.lock();
        st.cluster.as_ref().map_or(0, |c| c.version.index)
    }

    pub fn has_cluster(&self) -> bool {
        self.state.lock().cluster.is_some()
    }

    pub fn add_network(&self, name: &str) {
        self.state.lock().networks.push(overlay(name));
    }

    pub fn network_names(&self) -> Vec<String> {
        self.state.lock().networks.iter().map(|n| n.name.clone()).collect()
    }

    /// Number of successful network-create calls.
    pub fn network_creates(&self) -> usize {
        self.state.lock().network_creates
    }

    /// Register an existing service publishing the given host-mode ports.
    pub fn add_service(&self, spec: ServiceSpec, host_ports: &[u16]) {
        let mut st = self.state.lock();
        let index = st.next_index();
        let ports = host_ports
            .iter()
            .map(|p| hive_model::PortConfig::host_tcp(*p, *p))
            .collect();
        let svc = Service {
            id: format!("svc-{}", spec.name),
            version: ObjectVersion { index },
            endpoint: Some(Endpoint {
                ports: Some(ports),
                ..Default::default()
            }),
            spec,
            ..Default::default()
        };
        st.services.insert(svc.spec.name.clone(), svc);
    }

    pub fn service(&self, name: &str) -> Option<Service> {
        self.state.lock().services.get(name).cloned()
    }

    pub fn service_names(&self) -> Vec<String> {
        self.state.lock().services.keys().cloned().collect()
    }

    /// Number of successful service-create calls.
    pub fn service_creates(&self) -> usize {
        self.state.lock().service_creates
    }

    pub fn builds(&self) -> Vec<String> {
        self.state.lock().builds.iter().map(|(t, _)| t.clone()).collect()
    }

    /// Build context sent with the last build, if any.
    pub fn last_build_context(&self) -> Option<Vec<u8>> {
        self.state.lock().builds.last().map(|(_, c)| c.clone())
    }

    pub fn fail_builds(&self, message: &str) {
        self.state.lock().build_error = Some(message.to_string());
    }

    /// Queue the result of the next init call. Unscripted calls succeed.
    pub fn script_init(&self, result: EngineResult<String>) {
        self.state.lock().init_script.push_back(result);
    }

    pub fn init_calls(&self) -> Vec<SwarmInitRequest> {
        self.state.lock().init_calls.clone()
    }

    fn find_service<'a>(st: &'a mut FakeState, id: &str) -> Option<&'a mut Service> {
        st.services
            .values_mut()
            .find(|s| s.id == id || s.spec.name == id)
    }
}

fn overlay(name: &str) -> NetworkSummary {
    NetworkSummary {
        name: name.to_string(),
        id: format!("net-{name}"),
        driver: "overlay".into(),
        scope: "swarm".into(),
        ..Default::default()
    }
}

#[async_trait]
impl Engine for FakeEngine {
    async fn ping(&self) -> bool {
        tokio::task::yield_now().await;
        self.state.lock().reachable
    }

    async fn inspect_swarm(&self) -> EngineResult<ClusterObject> {
        tokio::task::yield_now().await;
        let st = self.state.lock();
        st.check()?;
        if st.swarm_hidden {
            return Err(EngineError::api(503, "swarm manager is starting"));
        }
        st.cluster.clone().ok_or_else(|| {
            EngineError::api(
                503,
                "This node is not a swarm manager. Use \"docker swarm init\" or \"docker swarm join\" to connect this node to swarm and try again.",
            )
        })
    }

    async fn update_swarm(&self, spec: &SwarmSpec, version: u64) -> EngineResult<()> {
        tokio::task::yield_now().await;
        let mut st = self.state.lock();
        st.check()?;
        let current = match st.cluster.as_ref() {
            Some(c) => c.version.index,
            None => return Err(EngineError::api(503, "This node is not a swarm manager.")),
        };
        if current != version {
            return Err(EngineError::api(
                500,
                "rpc error: code = Unknown desc = update out of sequence",
            ));
        }
        let index = st.next_index();
        if let Some(c) = st.cluster.as_mut() {
            c.spec = spec.clone();
            c.version.index = index;
        }
        Ok(())
    }

    async fn init_swarm(&self, req: &SwarmInitRequest) -> EngineResult<String> {
        tokio::task::yield_now().await;
        let mut st = self.state.lock();
        st.check()?;
        st.init_calls.push(req.clone());
        if st.cluster.is_some() {
            return Err(EngineError::api(503, "This node is already part of a swarm."));
        }
        let result = st
            .init_script
            .pop_front()
            .unwrap_or_else(|| Ok(FAKE_NODE_ID.to_string()));
        if result.is_ok() {
            let index = st.next_index();
            st.cluster = Some(ClusterObject {
                id: "cluster-0".into(),
                version: ObjectVersion { index },
                spec: SwarmSpec {
                    name: Some("default".into()),
                    ..Default::default()
                },
                ..Default::default()
            });
        }
        result
    }

    async fn list_networks(&self) -> EngineResult<Vec<NetworkSummary>> {
        tokio::task::yield_now().await;
        let st = self.state.lock();
        st.check()?;
        Ok(st.networks.clone())
    }

    async fn create_network(&self, req: &NetworkCreate) -> EngineResult<()> {
        tokio::task::yield_now().await;
        let mut st = self.state.lock();
        st.check()?;
        if st.networks.iter().any(|n| n.name == req.name) {
            return Err(EngineError::api(
                409,
                format!("network with name {} already exists", req.name),
            ));
        }
        st.networks.push(overlay(&req.name));
        st.network_creates += 1;
        Ok(())
    }

    async fn list_services(&self) -> EngineResult<Vec<Service>> {
        tokio::task::yield_now().await;
        let st = self.state.lock();
        st.check()?;
        Ok(st.services.values().cloned().collect())
    }

    async fn inspect_service(&self, id: &str) -> EngineResult<Option<Service>> {
        tokio::task::yield_now().await;
        let mut st = self.state.lock();
        st.check()?;
        Ok(Self::find_service(&mut st, id).map(|s| s.clone()))
    }

    async fn create_service(&self, spec: &ServiceSpec) -> EngineResult<ServiceCreated> {
        tokio::task::yield_now().await;
        let mut st = self.state.lock();
        st.check()?;
        if st.services.contains_key(&spec.name) {
            return Err(EngineError::api(
                409,
                format!("rpc error: code = AlreadyExists desc = name conflicts with an existing object: service {} already exists", spec.name),
            ));
        }
        let index = st.next_index();
        let id = format!("svc-{}", spec.name);
        let ports = spec.endpoint_spec.as_ref().and_then(|e| e.ports.clone());
        st.services.insert(
            spec.name.clone(),
            Service {
                id: id.clone(),
                version: ObjectVersion { index },
                spec: spec.clone(),
                endpoint: Some(Endpoint {
                    ports,
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        st.service_creates += 1;
        Ok(ServiceCreated { id, warnings: None })
    }

    async fn update_service(
        &self,
        id: &str,
        version: u64,
        spec: &ServiceSpec,
    ) -> EngineResult<()> {
        tokio::task::yield_now().await;
        let mut st = self.state.lock();
        st.check()?;
        let index = st.next_index();
        let Some(svc) = Self::find_service(&mut st, id) else {
            return Err(EngineError::api(404, format!("service {id} not found")));
        };
        if svc.version.index != version {
            return Err(EngineError::api(
                500,
                "rpc error: code = Unknown desc = update out of sequence",
            ));
        }
        svc.spec = spec.clone();
        svc.version.index = index;
        Ok(())
    }

    async fn delete_service(&self, id: &str) -> EngineResult<()> {
        tokio::task::yield_now().await;
        let mut st = self.state.lock();
        st.check()?;
        let before = st.services.len();
        st.services.retain(|_, s| s.id != id && s.spec.name != id);
        if st.services.len() == before {
            return Err(EngineError::api(404, format!("service {id} not found")));
        }
        Ok(())
    }

    async fn list_images(&self) -> EngineResult<Vec<ImageSummary>> {
        tokio::task::yield_now().await;
        let st = self.state.lock();
        st.check()?;
        Ok(st.images.clone())
    }

    async fn delete_image(&self, id: &str) -> EngineResult<()> {
        tokio::task::yield_now().await;
        let mut st = self.state.lock();
        st.check()?;
        let before = st.images.len();
        st.images
            .retain(|i| i.id != id && !i.repo_tags.iter().any(|t| t == id));
        if st.images.len() == before {
            return Err(EngineError::api(404, format!("No such image: {id}")));
        }
        Ok(())
    }

    async fn build_image(&self, tag: &str, context: Vec<u8>) -> EngineResult<()> {
        tokio::task::yield_now().await;
        let mut st = self.state.lock();
        st.check()?;
        if let Some(msg) = st.build_error.clone() {
            return Err(EngineError::Build(msg));
        }
        st.builds.push((tag.to_string(), context));
        let id = format!("sha256:{:012x}", st.builds.len());
        st.images.push(ImageSummary {
            id,
            repo_tags: vec![tag.to_string()],
            ..ImageSummary::default()
        });
        Ok(())
    }
}
