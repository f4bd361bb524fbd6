//! Client side of the orchestration engine API.
//!
//! The core only talks to the engine through [`Engine`]; [`HttpEngine`] is the
//! production implementation and `testing::FakeEngine` the in-memory one.
mod error;
pub use error::{EngineError, EngineResult};

mod http;
pub use http::HttpEngine;

use std::sync::Arc;

use async_trait::async_trait;
use hive_model::{
    ClusterObject, ImageSummary, NetworkCreate, NetworkSummary, Service, ServiceCreated, ServiceSpec,
    SwarmInitRequest, SwarmSpec,
};

/// Calls the panel issues against the engine.
#[async_trait]
pub trait Engine: Send + Sync + 'static {
    /// Liveness probe. Never fails; an unreachable engine is `false`.
    async fn ping(&self) -> bool;

    async fn inspect_swarm(&self) -> EngineResult<ClusterObject>;

    /// Replace the cluster spec. `version` must match the current version index.
    async fn update_swarm(&self, spec: &SwarmSpec, version: u64) -> EngineResult<()>;

    /// Initialize a new cluster and return the node id.
    async fn init_swarm(&self, req: &SwarmInitRequest) -> EngineResult<String>;

    async fn list_networks(&self) -> EngineResult<Vec<NetworkSummary>>;

    async fn create_network(&self, req: &NetworkCreate) -> EngineResult<()>;

    async fn list_services(&self) -> EngineResult<Vec<Service>>;

    /// Inspect a service by id or name; `None` when it does not exist.
    async fn inspect_service(&self, id: &str) -> EngineResult<Option<Service>>;

    async fn create_service(&self, spec: &ServiceSpec) -> EngineResult<ServiceCreated>;

    async fn update_service(&self, id: &str, version: u64, spec: &ServiceSpec)
    -> EngineResult<()>;

    async fn delete_service(&self, id: &str) -> EngineResult<()>;

    /// Build an image from a tar build context and tag it.
    async fn build_image(&self, tag: &str, context: Vec<u8>) -> EngineResult<()>;

    async fn list_images(&self) -> EngineResult<Vec<ImageSummary>>;

    /// Remove an image by id or tag.
    async fn delete_image(&self, id: &str) -> EngineResult<()>;
}

/// Shared handle to an engine client.
pub type EngineHandle = Arc<dyn Engine>;
