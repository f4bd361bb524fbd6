use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown update order: {0}")]
    UnknownUpdateOrder(String),

    #[error("unknown reverse proxy convention: {0}")]
    UnknownProxy(String),

    #[error("invalid model: {0}")]
    Invalid(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
