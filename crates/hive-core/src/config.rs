use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use hive_model::{ModelError, ProxyConvention};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Runtime settings of the panel core.
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Base URL of the engine API.
    pub engine_url: String,
    pub engine_timeout_ms: u64,
    /// HTTP listen port of the panel.
    pub port: u16,
    pub proxy: ProxyConvention,
    /// Substituted for `.*` in wildcard hostnames.
    pub root_domain: Option<String>,
    pub bootstrap_poll_ms: u64,
    pub bootstrap_attempts: u32,
    /// Identity provisioned when no credential exists.
    pub default_identity: String,
    /// Mark the session cookie `Secure`.
    pub secure_cookie: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            engine_url: "http://localhost:2375".to_string(),
            engine_timeout_ms: 10_000,
            port: 80,
            proxy: ProxyConvention::Caddy,
            root_domain: None,
            bootstrap_poll_ms: 1_000,
            bootstrap_attempts: 20,
            default_identity: "admin".to_string(),
            secure_cookie: true,
        }
    }
}

impl PanelConfig {
    pub const ENV_ENGINE_URL: &'static str = "HIVE_ENGINE_URL";
    pub const ENV_PORT: &'static str = "PORT";
    pub const ENV_PROXY: &'static str = "HIVE_PROXY";
    pub const ENV_ROOT_DOMAIN: &'static str = "HIVE_ROOT_DOMAIN";

    pub fn engine_timeout(&self) -> Duration {
        Duration::from_millis(self.engine_timeout_ms)
    }

    pub fn bootstrap_poll(&self) -> Duration {
        Duration::from_millis(self.bootstrap_poll_ms)
    }

    /// Override fields from environment-style variables; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get(Self::ENV_ENGINE_URL) {
            self.engine_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get(Self::ENV_PORT) {
            self.port = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: Self::ENV_PORT,
                value: v.clone(),
            })?;
        }
        if let Some(v) = get(Self::ENV_PROXY) {
            self.proxy = v.parse()?;
        }
        if let Some(v) = get(Self::ENV_ROOT_DOMAIN) {
            self.root_domain = Some(v);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        let cfg: PanelConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, PanelConfig::default());
        assert_eq!(cfg.bootstrap_attempts, 20);
        assert_eq!(cfg.bootstrap_poll(), Duration::from_secs(1));
        assert_eq!(cfg.default_identity, "admin");
    }

    #[test]
    fn env_overrides() {
        let mut cfg = PanelConfig::default();
        cfg.apply_env(|k| match k {
            "HIVE_ENGINE_URL" => Some("http://10.0.0.2:2375/".into()),
            "PORT" => Some("8080".into()),
            "HIVE_PROXY" => Some("traefik".into()),
            _ => None,
        })
        .unwrap();

        assert_eq!(cfg.engine_url, "http://10.0.0.2:2375");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.proxy, ProxyConvention::Traefik);
        assert_eq!(cfg.root_domain, None);
    }

    #[test]
    fn env_rejects_bad_port() {
        let mut cfg = PanelConfig::default();
        let err = cfg
            .apply_env(|k| (k == "PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "PORT", .. }));
    }
}
