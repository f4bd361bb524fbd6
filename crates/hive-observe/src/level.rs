use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::LoggerError;

/// Validated `EnvFilter` directive string, e.g. `"info"` or `"hive_core=debug,info"`.
///
/// This type lives at the configuration layer:
/// - it keeps the raw directive string as written in the config file or env;
/// - it is checked with `EnvFilter::try_new` once, at construction;
/// - it turns into a real `EnvFilter` on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LoggerLevel(String);

impl LoggerLevel {
    /// Validates `directives` and wraps them.
    ///
    /// # Errors
    /// [`LoggerError::InvalidLevel`] when `EnvFilter` rejects the string.
    ///
    /// # Examples
    /// ```
    /// use hive_observe::LoggerLevel;
    ///
    /// let lvl = LoggerLevel::new("hive_core=debug,info").unwrap();
    /// assert_eq!(lvl.as_str(), "hive_core=debug,info");
    /// assert!(LoggerLevel::new("hive_core=loud").is_err());
    /// ```
    pub fn new(directives: impl Into<String>) -> Result<Self, LoggerError> {
        let directives = directives.into();
        EnvFilter::try_new(&directives)
            .map_err(|e| LoggerError::InvalidLevel(format!("{directives}: {e}")))?;
        Ok(Self(directives))
    }

    /// Returns the directive string exactly as it was given.
    ///
    /// # Examples
    /// ```
    /// use hive_observe::LoggerLevel;
    ///
    /// let lvl = "warn".parse::<LoggerLevel>().unwrap();
    /// assert_eq!(lvl.as_str(), "warn");
    /// ```
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds the filter for the subscriber.
    ///
    /// The directives were validated at construction; the `info` fallback is
    /// never taken for a value built through this type.
    ///
    /// # Examples
    /// ```
    /// use hive_observe::LoggerLevel;
    ///
    /// let lvl = "hive_api=trace,info".parse::<LoggerLevel>().unwrap();
    /// let _filter = lvl.to_env_filter();
    /// ```
    pub fn to_env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.0).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// `info` for every target.
impl Default for LoggerLevel {
    fn default() -> Self {
        Self("info".to_string())
    }
}

impl FromStr for LoggerLevel {
    type Err = LoggerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.trim())
    }
}

impl TryFrom<String> for LoggerLevel {
    type Error = LoggerError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<LoggerLevel> for String {
    fn from(l: LoggerLevel) -> Self {
        l.0
    }
}
