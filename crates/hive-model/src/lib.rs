mod domain;
pub use domain::{
    DEFAULT_NETWORK, INGRESS_NETWORK, LABEL_PREFIX, LEGACY_CONTROL_NETWORK,
    LEGACY_CONTROL_SERVICE, Labels, ServiceLabel, SwarmLabel,
};

mod error;
pub use error::{ModelError, ModelResult};

mod spec;
pub use spec::{
    ContainerSpec, EndpointSpec, HealthCheck, Mount, NetworkAttachment, PortConfig,
    ReplicatedMode, ServiceMode, ServiceSpec, TaskTemplate, UpdateConfig,
};

mod cluster;
pub use cluster::{
    ClusterObject, Endpoint, ImageSummary, NetworkCreate, NetworkSummary, ObjectVersion, Service,
    ServiceCreated, SwarmInitRequest, SwarmSpec,
};

mod strategy;
pub use strategy::{ProxyConvention, UpdateOrder};

mod api;
pub use api::{CredentialUpdate, LoginRequest, ServiceRequest, ServiceRequestKind};
