use std::net::Ipv4Addr;

use thiserror::Error;

use crate::engine::EngineError;

#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The engine asked for an address and the retry with the best candidate failed too.
    #[error("could not initialize with any of {candidates:?}: {message}")]
    AmbiguousAddress {
        candidates: Vec<Ipv4Addr>,
        message: String,
    },

    #[error("engine returned a malformed cluster id {0:?}")]
    MalformedId(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
