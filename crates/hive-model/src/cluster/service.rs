use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ObjectVersion, PortConfig, ServiceSpec};

/// A service as returned by the engine's inspect and list calls.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Service {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(default)]
    pub version: ObjectVersion,
    #[serde(default)]
    pub spec: ServiceSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Endpoint>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Service {
    /// Ports currently published directly on the host by this service.
    pub fn host_ports(&self) -> impl Iterator<Item = u16> + '_ {
        self.endpoint
            .iter()
            .flat_map(|e| e.ports.iter().flatten())
            .filter(|p| p.is_host_mode())
            .filter_map(|p| p.published_port)
    }
}

/// Runtime endpoint state of a service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Endpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<PortConfig>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of the service-create call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceCreated {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}
