use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Per-task part of a service spec.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_spec: Option<ContainerSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networks: Option<Vec<NetworkAttachment>>,
    /// Counter that forces a redeploy when bumped, even if nothing else changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_update: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mounts: Option<Vec<Mount>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContainerSpec {
    /// Returns `true` if an env entry for `name` exists.
    pub fn has_env(&self, name: &str) -> bool {
        self.env_value(name).is_some()
    }

    /// Value of the env entry `name=...`, if present.
    pub fn env_value(&self, name: &str) -> Option<&str> {
        self.env.as_ref()?.iter().find_map(|e| {
            e.split_once('=')
                .filter(|(k, _)| *k == name)
                .map(|(_, v)| v)
        })
    }

    /// Returns `true` if some mount already targets `target`.
    pub fn has_mount_target(&self, target: &str) -> bool {
        self.mounts
            .as_ref()
            .is_some_and(|m| m.iter().any(|m| m.target.as_deref() == Some(target)))
    }
}

/// Bind, volume or tmpfs mount.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Mount {
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Mount {
    /// Bind mount of a host path.
    pub fn bind(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: Some("bind".into()),
            source: Some(source.into()),
            target: Some(target.into()),
            ..Default::default()
        }
    }

    /// Named volume mount.
    pub fn volume(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: Some("volume".into()),
            source: Some(source.into()),
            target: Some(target.into()),
            ..Default::default()
        }
    }
}

/// Container health check. Durations are nanoseconds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthCheck {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
}

impl HealthCheck {
    /// `CMD-SHELL` probe with the panel's usual timings (5s interval, 2s timeout, 3 retries).
    pub fn shell(command: impl Into<String>) -> Self {
        Self {
            test: vec!["CMD-SHELL".into(), command.into()],
            interval: Some(5_000_000_000),
            timeout: Some(2_000_000_000),
            retries: Some(3),
        }
    }
}

/// Network a service's tasks attach to.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkAttachment {
    pub target: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NetworkAttachment {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_type_uses_engine_field_name() {
        let m = Mount::bind("/var/run/docker.sock", "/var/run/docker.sock");
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["Type"], "bind");
        assert_eq!(v["Source"], "/var/run/docker.sock");
        assert!(v.get("ReadOnly").is_none());
    }

    #[test]
    fn env_lookup_matches_whole_name() {
        let c = ContainerSpec {
            env: Some(vec!["FOO_BAR=1".into(), "FOO=2".into()]),
            ..Default::default()
        };
        assert_eq!(c.env_value("FOO"), Some("2"));
        assert!(c.has_env("FOO_BAR"));
        assert!(!c.has_env("BAR"));
    }
}
