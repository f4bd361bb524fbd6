//! Logging setup shared by the panel binaries.
//!
//! One [`LoggerConfig`] selects the output (text, JSON or journald), the filter
//! expression and the timestamp zone; [`init_logger`] installs it globally.
mod clock;
mod config;
mod error;
mod format;
mod init;
mod level;

pub use clock::{LoggerClock, LoggerTimeZone, init_local_offset};
pub use config::LoggerConfig;
pub use error::{LoggerError, LoggerResult};
pub use format::LoggerFormat;
pub use level::LoggerLevel;

/// Installs the global tracing subscriber described by `cfg`.
///
/// Fails with [`LoggerError::AlreadyInitialized`] when called twice.
/// When `cfg.tz` is [`LoggerTimeZone::Local`], call [`init_local_offset`]
/// before the async runtime starts any threads.
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    match cfg.format {
        LoggerFormat::Text => init::text(cfg),
        LoggerFormat::Json => init::json(cfg),
        LoggerFormat::Journald => init::journald(cfg),
    }
}
