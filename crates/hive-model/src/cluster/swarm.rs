use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Labels;

/// Version counter used for optimistic concurrency on engine objects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectVersion {
    #[serde(default)]
    pub index: u64,
}

/// The cluster-wide record returned by the engine's swarm inspect call.
///
/// Its label map is the panel's configuration store. Every update must carry
/// the `version` observed at read time; a stale version is rejected by the engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterObject {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(default)]
    pub version: ObjectVersion,
    #[serde(default)]
    pub spec: SwarmSpec,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClusterObject {
    pub fn labels(&self) -> &Labels {
        &self.spec.labels
    }

    pub fn version_index(&self) -> u64 {
        self.version.index
    }
}

/// Writable part of the cluster object; the body of a swarm update.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SwarmSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub labels: Labels,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of the cluster-init call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SwarmInitRequest {
    pub listen_addr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertise_addr: Option<String>,
}

impl SwarmInitRequest {
    /// Listen address used when the caller does not pick an interface.
    pub const DEFAULT_LISTEN: &'static str = "0.0.0.0:2377";

    /// Set the listen address to `addr`, keeping the default port.
    pub fn listen_on(addr: &str) -> Self {
        Self {
            listen_addr: format!("{addr}:2377"),
            advertise_addr: None,
        }
    }

    /// Keep the default listen address and advertise `addr`.
    pub fn advertise(addr: &str) -> Self {
        Self {
            listen_addr: Self::DEFAULT_LISTEN.to_string(),
            advertise_addr: Some(addr.to_string()),
        }
    }
}

impl Default for SwarmInitRequest {
    fn default() -> Self {
        Self {
            listen_addr: Self::DEFAULT_LISTEN.to_string(),
            advertise_addr: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_engine_swarm_inspect() {
        let raw = json!({
            "ID": "abajmipo7b4xz5ip2nrla6b11",
            "Version": { "Index": 373531 },
            "CreatedAt": "2016-08-18T10:44:24.496525531Z",
            "Spec": {
                "Name": "default",
                "Labels": { "hive.panel.tint": "120" },
                "Orchestration": { "TaskHistoryRetentionLimit": 10 }
            },
            "JoinTokens": { "Worker": "SWMTKN-1-x", "Manager": "SWMTKN-1-y" }
        });

        let cluster: ClusterObject = serde_json::from_value(raw).unwrap();
        assert_eq!(cluster.version_index(), 373531);
        assert_eq!(cluster.labels().get("hive.panel.tint"), Some("120"));
        assert!(cluster.spec.extra.contains_key("Orchestration"));
        assert!(cluster.extra.contains_key("JoinTokens"));
    }

    #[test]
    fn init_request_shapes() {
        assert_eq!(SwarmInitRequest::default().listen_addr, "0.0.0.0:2377");
        assert_eq!(SwarmInitRequest::listen_on("10.0.0.5").listen_addr, "10.0.0.5:2377");

        let adv = SwarmInitRequest::advertise("10.0.0.5");
        let v = serde_json::to_value(&adv).unwrap();
        assert_eq!(v["AdvertiseAddr"], "10.0.0.5");
        assert_eq!(v["ListenAddr"], "0.0.0.0:2377");
    }
}
