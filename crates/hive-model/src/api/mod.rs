mod service_request;
pub use service_request::{ServiceRequest, ServiceRequestKind};

mod credentials;
pub use credentials::{CredentialUpdate, LoginRequest};
