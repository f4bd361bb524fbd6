use serde::{Deserialize, Serialize};
use std::io::IsTerminal;

use crate::{LoggerFormat, LoggerLevel, LoggerResult, LoggerTimeZone};

/// Logger configuration.
///
/// Every field has a default, so a partial JSON object (or none at all) is a
/// valid configuration. Environment overrides are applied with
/// [`LoggerConfig::apply_env`].
///
/// # Examples
/// ```
/// use hive_observe::{LoggerConfig, LoggerFormat};
///
/// let cfg: LoggerConfig = serde_json::from_str(r#"{"format":"json"}"#).unwrap();
/// assert_eq!(cfg.format, LoggerFormat::Json);
/// assert_eq!(cfg.level.as_str(), "info");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Output sink and encoding.
    pub format: LoggerFormat,
    /// `EnvFilter` directives (e.g. `"info"`, `"hive_core=debug,info"`).
    pub level: LoggerLevel,
    /// Zone of the RFC3339 timestamps.
    pub tz: LoggerTimeZone,
    /// Print the module target next to each line.
    pub with_targets: bool,
    /// Colour text output. Ignored unless stdout is a terminal.
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::Text,
            level: LoggerLevel::default(),
            tz: LoggerTimeZone::Utc,
            with_targets: true,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Overrides [`LoggerConfig::level`].
    pub const ENV_LEVEL: &'static str = "HIVE_LOG_LEVEL";
    /// Overrides [`LoggerConfig::format`].
    pub const ENV_FORMAT: &'static str = "HIVE_LOG_FORMAT";
    /// Overrides [`LoggerConfig::tz`].
    pub const ENV_TZ: &'static str = "HIVE_LOG_TZ";

    /// Returns `true` when colour is wanted and stdout is a terminal.
    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }

    /// Override fields from environment-style variables.
    ///
    /// `lookup` is usually `|k| std::env::var(k).ok()`; empty values are ignored.
    ///
    /// # Errors
    /// The first value that fails to parse; fields set before it stay applied.
    ///
    /// # Examples
    /// ```
    /// use hive_observe::{LoggerConfig, LoggerTimeZone};
    ///
    /// let mut cfg = LoggerConfig::default();
    /// cfg.apply_env(|k| (k == "HIVE_LOG_TZ").then(|| "local".to_string()))
    ///     .unwrap();
    /// assert_eq!(cfg.tz, LoggerTimeZone::Local);
    /// ```
    pub fn apply_env<F>(&mut self, lookup: F) -> LoggerResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(Self::ENV_LEVEL) {
            self.level = v.parse()?;
        }
        if let Some(v) = get(Self::ENV_FORMAT) {
            self.format = v.parse()?;
        }
        if let Some(v) = get(Self::ENV_TZ) {
            self.tz = v.parse()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LoggerError;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: LoggerConfig = serde_json::from_str(r#"{"format":"json"}"#).unwrap();
        assert_eq!(cfg.format, LoggerFormat::Json);
        assert_eq!(cfg.level.as_str(), "info");
        assert_eq!(cfg.tz, LoggerTimeZone::Utc);
        assert!(cfg.with_targets);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = LoggerConfig::default();
        cfg.apply_env(env(&[
            ("HIVE_LOG_LEVEL", "hive_core=debug,info"),
            ("HIVE_LOG_FORMAT", "json"),
            ("HIVE_LOG_TZ", ""),
        ]))
        .unwrap();

        assert_eq!(cfg.level.as_str(), "hive_core=debug,info");
        assert_eq!(cfg.format, LoggerFormat::Json);
        assert_eq!(cfg.tz, LoggerTimeZone::Utc);
    }

    #[test]
    fn env_rejects_invalid_values() {
        let mut cfg = LoggerConfig::default();
        let err = cfg.apply_env(env(&[("HIVE_LOG_TZ", "mars")])).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidTimeZone(_)));
    }
}
