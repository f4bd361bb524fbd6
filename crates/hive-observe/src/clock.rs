use std::{
    fmt,
    str::FromStr,
    sync::OnceLock,
};

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::fmt::{format::Writer, time::FormatTime};

use crate::LoggerError;

static LOCAL_OFFSET: OnceLock<UtcOffset> = OnceLock::new();

/// Zone used for log timestamps.
///
/// # Examples
/// ```
/// use hive_observe::LoggerTimeZone;
///
/// assert_eq!(" Local ".parse::<LoggerTimeZone>().unwrap(), LoggerTimeZone::Local);
/// assert_eq!(LoggerTimeZone::default(), LoggerTimeZone::Utc);
/// assert!("mars".parse::<LoggerTimeZone>().is_err());
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggerTimeZone {
    #[default]
    Utc,
    /// Offset captured by [`init_local_offset`]; UTC if it never ran.
    Local,
}

impl FromStr for LoggerTimeZone {
    type Err = LoggerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utc" => Ok(Self::Utc),
            "local" => Ok(Self::Local),
            _ => Err(LoggerError::InvalidTimeZone(s.to_string())),
        }
    }
}

impl fmt::Display for LoggerTimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoggerTimeZone::Utc => "utc",
            LoggerTimeZone::Local => "local",
        })
    }
}

/// Detect and cache the local UTC offset.
///
/// Must run before the async runtime spawns worker threads: most Unix
/// platforms refuse offset detection once the process is multi-threaded.
/// Falls back to UTC when detection fails.
pub fn init_local_offset() -> UtcOffset {
    *LOCAL_OFFSET.get_or_init(|| UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
}

/// RFC3339 timer for the fmt layer.
///
/// Renders `2026-10-18T09:30:00Z` in UTC, or the same instant with the cached
/// local offset (`2026-10-18T11:30:00+02:00`) for [`LoggerTimeZone::Local`].
#[derive(Debug, Clone, Copy)]
pub struct LoggerClock {
    tz: LoggerTimeZone,
}

impl LoggerClock {
    /// Creates a timer for `tz`.
    ///
    /// # Examples
    /// ```
    /// use hive_observe::{LoggerClock, LoggerTimeZone};
    ///
    /// let _clock = LoggerClock::new(LoggerTimeZone::Utc);
    /// ```
    pub fn new(tz: LoggerTimeZone) -> Self {
        Self { tz }
    }

    fn offset(&self) -> UtcOffset {
        match self.tz {
            LoggerTimeZone::Utc => UtcOffset::UTC,
            LoggerTimeZone::Local => LOCAL_OFFSET.get().copied().unwrap_or(UtcOffset::UTC),
        }
    }

    fn stamp(&self, at: OffsetDateTime) -> String {
        at.to_offset(self.offset())
            .format(&Rfc3339)
            .unwrap_or_else(|_| "<invalid-time>".to_string())
    }
}

impl FormatTime for LoggerClock {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{} ", self.stamp(OffsetDateTime::now_utc()))
    }
}
