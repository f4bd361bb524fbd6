use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    Labels, ModelError, ModelResult, ServiceLabel,
    spec::{ContainerSpec, EndpointSpec, ServiceMode, TaskTemplate, UpdateConfig},
};

/// Declarative description of a deployable unit, as consumed by the engine.
///
/// `ServiceSpec` is the mutable document threaded through the spec pipeline.
/// Only the fields the panel reasons about are typed; everything else the
/// client sent is kept in `extra` and submitted unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceSpec {
    /// Service name, unique within the cluster.
    #[serde(default)]
    pub name: String,
    /// Service labels. Panel directives live under the `hive.` prefix.
    #[serde(default)]
    pub labels: Labels,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_template: Option<TaskTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ServiceMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_config: Option<UpdateConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_spec: Option<EndpointSpec>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServiceSpec {
    /// Create an otherwise empty spec with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Read a panel directive, treating an empty value as unset.
    pub fn label(&self, label: &ServiceLabel) -> Option<&str> {
        self.labels.get_set(&label.key())
    }

    /// Write a panel directive.
    pub fn set_label(&mut self, label: &ServiceLabel, value: impl Into<String>) -> &mut Self {
        self.labels.insert(label.key(), value);
        self
    }

    /// Builder-style variant of [`ServiceSpec::set_label`].
    pub fn with_label(mut self, label: &ServiceLabel, value: impl Into<String>) -> Self {
        self.set_label(label, value);
        self
    }

    /// Task template, created empty when missing.
    pub fn task_mut(&mut self) -> &mut TaskTemplate {
        self.task_template.get_or_insert_with(TaskTemplate::default)
    }

    /// Container spec, created (together with the task template) when missing.
    pub fn container_mut(&mut self) -> &mut ContainerSpec {
        self.task_mut()
            .container_spec
            .get_or_insert_with(ContainerSpec::default)
    }

    /// Container spec, if the task template has one.
    pub fn container(&self) -> Option<&ContainerSpec> {
        self.task_template.as_ref()?.container_spec.as_ref()
    }

    /// Image of the container spec, if any.
    pub fn image(&self) -> Option<&str> {
        self.container()?.image.as_deref()
    }

    /// Check the name against the engine's rules: 1 to 63 characters, alphanumeric
    /// first, then alphanumerics, `_`, `.` or `-`.
    pub fn validate_name(&self) -> ModelResult<()> {
        let name = self.name.as_str();
        let mut chars = name.chars();
        let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
        let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
        if first_ok && rest_ok && name.len() <= 63 {
            Ok(())
        } else {
            Err(ModelError::Invalid(format!("service name {name:?}")))
        }
    }

    /// Returns `true` when the task template already names at least one network.
    pub fn has_networks(&self) -> bool {
        self.task_template
            .as_ref()
            .and_then(|t| t.networks.as_ref())
            .is_some_and(|n| !n.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let raw = json!({
            "Name": "web",
            "Labels": { "hive.port": "8080" },
            "TaskTemplate": {
                "ContainerSpec": { "Image": "nginx", "Hostname": "web-1" },
                "RestartPolicy": { "Condition": "any" }
            },
            "RollbackConfig": { "Parallelism": 1 }
        });

        let spec: ServiceSpec = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(spec.name, "web");
        assert_eq!(spec.image(), Some("nginx"));
        assert!(spec.extra.contains_key("RollbackConfig"));

        let back = serde_json::to_value(&spec).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn label_treats_empty_as_unset() {
        let spec = ServiceSpec::named("web")
            .with_label(&ServiceLabel::Hostnames, "")
            .with_label(&ServiceLabel::Port, "8080");

        assert_eq!(spec.label(&ServiceLabel::Hostnames), None);
        assert_eq!(spec.label(&ServiceLabel::Port), Some("8080"));
    }

    #[test]
    fn validate_name_rejects_empty_and_malformed() {
        assert!(ServiceSpec::named("web-1.api_v2").validate_name().is_ok());
        assert!(ServiceSpec::named("").validate_name().is_err());
        assert!(ServiceSpec::named("-web").validate_name().is_err());
        assert!(ServiceSpec::named("we b").validate_name().is_err());
        assert!(ServiceSpec::named("a".repeat(64)).validate_name().is_err());
    }

    #[test]
    fn container_mut_creates_missing_parents() {
        let mut spec = ServiceSpec::named("web");
        spec.container_mut().image = Some("redis:7".into());
        assert_eq!(spec.image(), Some("redis:7"));
        assert!(!spec.has_networks());
    }
}
