use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};

/// Order in which the engine swaps old and new tasks during a rolling update.
///
/// Strategies:
/// - `StartFirst`: start the new task, then stop the old one. Needs a health check to be useful.
/// - `StopFirst`: stop the old task before starting the new one.
///
/// Users pick one through the `hive.update` service label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateOrder {
    StartFirst,
    StopFirst,
}

impl UpdateOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateOrder::StartFirst => "start-first",
            UpdateOrder::StopFirst => "stop-first",
        }
    }
}

impl FromStr for UpdateOrder {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start-first" => Ok(UpdateOrder::StartFirst),
            "stop-first" => Ok(UpdateOrder::StopFirst),
            other => Err(ModelError::UnknownUpdateOrder(other.to_string())),
        }
    }
}
