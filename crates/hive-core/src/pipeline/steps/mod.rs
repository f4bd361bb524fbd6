mod compat;
mod deploy;
mod network;
mod proxy;
mod sanitize;
mod update;

pub use compat::CompatibilityShim;
pub use deploy::DeployDirective;
pub use network::NetworkAssignment;
pub use proxy::{ReverseProxyLabels, split_hostnames};
pub use sanitize::SanitizeSpec;
pub use update::UpdateStrategy;
