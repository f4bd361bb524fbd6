use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::LoggerError;

/// Where and how log lines are written.
///
/// Parsed case-insensitively; `pretty` is accepted for `text` and `journal`
/// for `journald`. Journald is only available on Linux.
///
/// # Examples
/// ```
/// use hive_observe::LoggerFormat;
///
/// assert_eq!("JSON".parse::<LoggerFormat>().unwrap(), LoggerFormat::Json);
/// assert_eq!("pretty".parse::<LoggerFormat>().unwrap(), LoggerFormat::Text);
/// assert_eq!(LoggerFormat::Json.to_string(), "json");
/// assert!("xml".parse::<LoggerFormat>().is_err());
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LoggerFormat {
    /// Human-readable lines on stdout.
    #[default]
    Text,
    /// One JSON object per line on stdout.
    Json,
    /// systemd-journald (Linux only).
    Journald,
}

impl FromStr for LoggerFormat {
    type Err = LoggerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "journald" | "journal" if cfg!(target_os = "linux") => Ok(Self::Journald),
            "journald" | "journal" => Err(LoggerError::JournaldNotSupported),
            _ => Err(LoggerError::InvalidFormat(s.to_string())),
        }
    }
}

impl TryFrom<String> for LoggerFormat {
    type Error = LoggerError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<LoggerFormat> for String {
    fn from(f: LoggerFormat) -> Self {
        f.to_string()
    }
}

impl fmt::Display for LoggerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoggerFormat::Text => "text",
            LoggerFormat::Json => "json",
            LoggerFormat::Journald => "journald",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("JSON".parse::<LoggerFormat>().unwrap(), LoggerFormat::Json);
        assert_eq!(" text ".parse::<LoggerFormat>().unwrap(), LoggerFormat::Text);
        assert_eq!("pretty".parse::<LoggerFormat>().unwrap(), LoggerFormat::Text);
    }

    #[test]
    fn rejects_unknown() {
        for bad in ["", "xml", "logfmt"] {
            assert!(matches!(
                bad.parse::<LoggerFormat>(),
                Err(LoggerError::InvalidFormat(_))
            ));
        }
    }

    #[test]
    fn journald_depends_on_platform() {
        let parsed = "journald".parse::<LoggerFormat>();
        if cfg!(target_os = "linux") {
            assert_eq!(parsed.unwrap(), LoggerFormat::Journald);
        } else {
            assert!(matches!(parsed, Err(LoggerError::JournaldNotSupported)));
        }
    }

    #[test]
    fn serde_uses_canonical_names() {
        assert_eq!(serde_json::to_string(&LoggerFormat::Json).unwrap(), r#""json""#);
        let f: LoggerFormat = serde_json::from_str(r#""Text""#).unwrap();
        assert_eq!(f, LoggerFormat::Text);
        assert!(serde_json::from_str::<LoggerFormat>(r#""yaml""#).is_err());
    }
}
