use thiserror::Error;

use crate::{
    auth::AuthError, bootstrap::BootstrapError, config::ConfigError, engine::EngineError,
    hook::HookError, pipeline::PipelineError, store::StoreError,
};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("label store: {0}")]
    Store(#[from] StoreError),

    #[error("pipeline: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("bootstrap: {0}")]
    Bootstrap(#[from] BootstrapError),

    #[error("auth: {0}")]
    Auth(#[from] AuthError),

    #[error("deploy hook: {0}")]
    Hook(#[from] HookError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

impl CoreError {
    /// The engine error at the root of this failure, if any.
    pub fn engine(&self) -> Option<&EngineError> {
        match self {
            CoreError::Engine(e) => Some(e),
            CoreError::Store(StoreError::Migrate(e)) => Some(e),
            CoreError::Pipeline(PipelineError::Engine(e)) => Some(e),
            CoreError::Bootstrap(BootstrapError::Engine(e)) => Some(e),
            CoreError::Hook(HookError::Engine(e)) => Some(e),
            _ => None,
        }
    }
}
