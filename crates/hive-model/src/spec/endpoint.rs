use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<PortConfig>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Published port of a service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PortConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_port: Option<u16>,
    /// `ingress` or `host`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_mode: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PortConfig {
    /// TCP port published directly on the host.
    pub fn host_tcp(target: u16, published: u16) -> Self {
        Self {
            protocol: Some("tcp".into()),
            target_port: Some(target),
            published_port: Some(published),
            publish_mode: Some("host".into()),
            extra: Map::new(),
        }
    }

    /// Returns `true` for ports bound on the host network stack.
    pub fn is_host_mode(&self) -> bool {
        self.publish_mode.as_deref() == Some("host")
    }
}
