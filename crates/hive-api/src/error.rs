use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use hive_core::{
    auth::AuthError,
    bootstrap::BootstrapError,
    engine::EngineError,
    error::CoreError,
    hook::HookError,
    pipeline::PipelineError,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError::Core(e.into())
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        ApiError::Core(e.into())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::Core(e.into())
    }
}

impl From<HookError> for ApiError {
    fn from(e: HookError) -> Self {
        ApiError::Core(e.into())
    }
}

impl From<BootstrapError> for ApiError {
    fn from(e: BootstrapError) -> Self {
        ApiError::Core(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Engine rejections go back to the client exactly as the engine sent them.
        if let ApiError::Core(core) = &self {
            if let Some(EngineError::Api { status, body }) = core.engine() {
                debug!(status, "engine error passed through");
                let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
                return (status, Json(body.clone())).into_response();
            }
        }

        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        let body = match &self {
            ApiError::Core(CoreError::Bootstrap(BootstrapError::AmbiguousAddress {
                candidates,
                message,
            })) => json!({ "message": message, "candidates": candidates }),
            _ => json!({ "status": status.as_u16(), "message": self.message() }),
        };
        (status, Json(body)).into_response()
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Core(core) => match core {
                CoreError::Auth(AuthError::Unauthorized) => StatusCode::UNAUTHORIZED,
                CoreError::Auth(_) => StatusCode::BAD_REQUEST,
                CoreError::Hook(HookError::Unauthorized) => StatusCode::UNAUTHORIZED,
                CoreError::Hook(HookError::Engine(e)) => engine_status(e),
                CoreError::Hook(_) => StatusCode::BAD_REQUEST,
                CoreError::Pipeline(PipelineError::Engine(e)) => engine_status(e),
                CoreError::Pipeline(_) => StatusCode::BAD_REQUEST,
                CoreError::Bootstrap(BootstrapError::AmbiguousAddress { .. }) => {
                    StatusCode::CONFLICT
                }
                CoreError::Bootstrap(BootstrapError::Engine(e)) => engine_status(e),
                CoreError::Bootstrap(_) => StatusCode::BAD_GATEWAY,
                CoreError::Engine(e) => engine_status(e),
                CoreError::Store(_) | CoreError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Client-facing message. Auth and hook errors keep their own wording.
    fn message(&self) -> String {
        match self {
            ApiError::Core(CoreError::Auth(AuthError::InvalidCredentials)) => {
                "Invalid credentials".to_string()
            }
            ApiError::Core(CoreError::Auth(AuthError::Unauthorized)) => "Unauthorized".to_string(),
            ApiError::Core(CoreError::Hook(e)) => e.to_string(),
            ApiError::Core(CoreError::Pipeline(PipelineError::Build(msg))) => msg.clone(),
            other => other.to_string(),
        }
    }
}

fn engine_status(e: &EngineError) -> StatusCode {
    match e {
        EngineError::Api { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        EngineError::Build(_) => StatusCode::BAD_REQUEST,
        EngineError::Unreachable(_) | EngineError::Decode(_) => StatusCode::BAD_GATEWAY,
    }
}
