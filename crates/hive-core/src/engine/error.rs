use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine unreachable: {0}")]
    Unreachable(String),

    /// Non-2xx answer. `body` is the engine's own JSON error document.
    #[error("engine returned {status}: {}", api_message(.body))]
    Api { status: u16, body: Value },

    #[error("unexpected engine response: {0}")]
    Decode(String),

    #[error("image build failed: {0}")]
    Build(String),
}

impl EngineError {
    /// Build an [`EngineError::Api`] with a plain message body.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        EngineError::Api {
            status,
            body: serde_json::json!({ "message": message.into() }),
        }
    }

    /// Human-readable message, taken from the engine body when there is one.
    pub fn message(&self) -> String {
        match self {
            EngineError::Api { body, .. } => api_message(body),
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            EngineError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Stale version on an optimistic-concurrency update.
    pub fn is_conflict(&self) -> bool {
        match self {
            EngineError::Api { status: 409, .. } => true,
            EngineError::Api { body, .. } => api_message(body).contains("update out of sequence"),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::Api { status: 404, .. })
    }

    /// Create call for something that is already there.
    pub fn is_already_exists(&self) -> bool {
        match self {
            EngineError::Api { status: 409, .. } => true,
            EngineError::Api { body, .. } => api_message(body).contains("already exists"),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            EngineError::Decode(e.to_string())
        } else {
            EngineError::Unreachable(e.to_string())
        }
    }
}

fn api_message(body: &Value) -> String {
    match body.get("message").and_then(Value::as_str) {
        Some(m) => m.to_string(),
        None => body.to_string(),
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
