use thiserror::Error;

use crate::engine::EngineError;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic-concurrency rejection. The write was dropped.
    #[error("cluster object moved past version {version}; label write dropped")]
    Conflict { version: u64 },

    #[error("no cluster object observed")]
    NotObserved,

    #[error("engine rejected label migration: {0}")]
    Migrate(#[source] EngineError),
}
