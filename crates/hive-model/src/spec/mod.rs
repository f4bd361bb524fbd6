mod service;
pub use service::ServiceSpec;

mod task;
pub use task::{ContainerSpec, HealthCheck, Mount, NetworkAttachment, TaskTemplate};

mod endpoint;
pub use endpoint::{EndpointSpec, PortConfig};

mod mode;
pub use mode::{ReplicatedMode, ServiceMode, UpdateConfig};
