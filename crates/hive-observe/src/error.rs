use thiserror::Error;

/// Errors raised while parsing logger configuration or installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("invalid log format: {0} (expected text|json|journald)")]
    InvalidFormat(String),

    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    #[error("invalid timezone: {0} (expected utc|local)")]
    InvalidTimeZone(String),

    #[error("journald is not supported on this platform")]
    JournaldNotSupported,

    #[error("failed to connect to journald: {0}")]
    JournaldInitFailed(String),

    #[error("logger already initialized")]
    AlreadyInitialized,
}

/// Result alias for logger operations.
pub type LoggerResult<T> = Result<T, LoggerError>;
