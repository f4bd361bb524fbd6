use thiserror::Error;

use crate::engine::EngineError;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Inline image build failed. Nothing is submitted.
    #[error("image build failed: {0}")]
    Build(String),

    #[error("invalid service spec: {0}")]
    Invalid(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
