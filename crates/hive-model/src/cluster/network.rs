use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Entry of the engine's network list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkSummary {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub scope: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NetworkSummary {
    /// Overlay network spanning the whole cluster.
    pub fn is_swarm_overlay(&self) -> bool {
        self.driver == "overlay" && self.scope == "swarm"
    }
}

/// Body of the network-create call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkCreate {
    pub name: String,
    pub driver: String,
    pub scope: String,
    pub attachable: bool,
    pub check_duplicate: bool,
}

impl NetworkCreate {
    /// Attachable, cluster-scoped overlay network.
    pub fn overlay(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            driver: "overlay".into(),
            scope: "swarm".into(),
            attachable: true,
            check_duplicate: true,
        }
    }
}
