//! Login, logout, credential rotation and the session guard.
use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::debug;

use hive_core::auth::{Session, clear_cookie, token_from_cookies};
use hive_model::{CredentialUpdate, LoginRequest};

use crate::{error::ApiError, state::PanelState};

#[derive(Debug, Serialize)]
struct AuthResponse {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity: Option<String>,
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(token_from_cookies)
        .map(str::to_string)
}

/// Reject requests without a valid session; attach the [`Session`] otherwise.
pub(crate) async fn require_session(
    State(state): State<Arc<PanelState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session_token(req.headers()).ok_or(ApiError::Unauthorized)?;
    let session = state.auth().validate(&token).map_err(|_| {
        debug!(path = %req.uri().path(), "session rejected");
        ApiError::Unauthorized
    })?;
    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

/// POST /api/auth/login
pub(crate) async fn login(
    State(state): State<Arc<PanelState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.auth().login(&req.identity, &req.secret)?;
    let cookie = session.cookie(state.ctx().config().secure_cookie);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            message: "Logged in",
            identity: Some(session.identity),
        }),
    ))
}

/// POST /api/auth/logout
///
/// Always clears the cookie; a valid session is tombstoned as well.
pub(crate) async fn logout(
    State(state): State<Arc<PanelState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(session) = session_token(&headers).and_then(|t| state.auth().validate(&t).ok()) {
        state.auth().logout(&session);
    }
    (
        [(header::SET_COOKIE, clear_cookie(state.ctx().config().secure_cookie))],
        Json(AuthResponse {
            message: "Logged out",
            identity: None,
        }),
    )
}

/// PUT /api/auth/credentials
pub(crate) async fn rotate(
    State(state): State<Arc<PanelState>>,
    Extension(session): Extension<Session>,
    Json(update): Json<CredentialUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.auth().rotate(&session, &update)?;
    Ok(Json(AuthResponse {
        message: "Credentials updated",
        identity: Some(session.identity),
    }))
}
