pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod hook;
pub mod metrics;
pub mod pipeline;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub mod prelude {
    pub use crate::auth::{AuthError, AuthGateway, BootstrapCredential, Session};
    pub use crate::bootstrap::{BootstrapReport, BootstrapState, ClusterBootstrap};
    pub use crate::config::PanelConfig;
    pub use crate::context::Context;
    pub use crate::engine::{Engine, EngineError, EngineHandle, HttpEngine};
    pub use crate::error::CoreError;
    pub use crate::hook::{DeployHook, HookError, HookReport};
    pub use crate::metrics::{MetricsBackend, MetricsHandle, noop_metrics};
    pub use crate::pipeline::{Pipeline, PipelineError, Step, Submitted};
    pub use crate::store::{LabelStore, LoadOutcome};
}
