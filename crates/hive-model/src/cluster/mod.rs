mod swarm;
pub use swarm::{ClusterObject, ObjectVersion, SwarmInitRequest, SwarmSpec};

mod network;
pub use network::{NetworkCreate, NetworkSummary};

mod image;
pub use image::ImageSummary;

mod service;
pub use service::{Endpoint, Service, ServiceCreated};
