use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use hive_core::config::PanelConfig;
use hive_observe::LoggerConfig;

/// Everything the daemon reads at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub panel: PanelConfig,
    pub logger: LoggerConfig,
}

impl DaemonConfig {
    /// Path of an optional JSON config file.
    pub const ENV_CONFIG: &'static str = "HIVE_CONFIG";

    /// Read the file named by `HIVE_CONFIG` (if any), then apply env overrides.
    pub fn load<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match lookup(Self::ENV_CONFIG).filter(|p| !p.trim().is_empty()) {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading config file {path}"))?;
                Self::parse(&raw).with_context(|| format!("parsing config file {path}"))?
            }
            None => Self::default(),
        };
        cfg.panel.apply_env(&lookup)?;
        cfg.logger.apply_env(&lookup)?;
        Ok(cfg)
    }

    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_observe::LoggerFormat;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn no_file_means_defaults() {
        let cfg = DaemonConfig::load(env(&[])).unwrap();
        assert_eq!(cfg.panel, PanelConfig::default());
        assert_eq!(cfg.logger.format, LoggerFormat::Text);
    }

    #[test]
    fn env_wins_over_file() {
        let path = std::env::temp_dir().join(format!("hive-paneld-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"panel":{"port":8080,"root_domain":"example.test"},"logger":{"format":"json"}}"#,
        )
        .unwrap();

        let cfg = DaemonConfig::load(env(&[
            ("HIVE_CONFIG", path.to_str().unwrap()),
            ("PORT", "3000"),
            ("HIVE_LOG_LEVEL", "debug"),
        ]))
        .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(cfg.panel.port, 3000);
        assert_eq!(cfg.panel.root_domain.as_deref(), Some("example.test"));
        assert_eq!(cfg.logger.format, LoggerFormat::Json);
        assert_eq!(cfg.logger.level.as_str(), "debug");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = DaemonConfig::load(env(&[("HIVE_CONFIG", "/nonexistent/hive.json")])).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/hive.json"));
    }

    #[test]
    fn bad_proxy_convention_is_rejected() {
        assert!(DaemonConfig::load(env(&[("HIVE_PROXY", "nginx")])).is_err());
    }
}
