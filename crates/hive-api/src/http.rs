use std::{collections::BTreeMap, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use hive_core::{
    bootstrap::{BootstrapReport, BootstrapState},
    hook::HookReport,
};
use hive_model::{ServiceRequest, ServiceSpec, SwarmLabel};

use crate::{error::ApiError, session, state::PanelState};

/// HTTP API service builder.
pub struct HttpApi {
    state: Arc<PanelState>,
}

impl HttpApi {
    pub fn new(state: Arc<PanelState>) -> Self {
        Self { state }
    }

    /// Build the axum router.
    ///
    /// Public routes:
    /// - POST /api/auth/login
    /// - POST /api/auth/logout
    /// - GET/POST /api/hook - deploy webhook, authenticated by its own key
    ///
    /// Session-guarded routes:
    /// - GET /api/state
    /// - PUT /api/auth/credentials
    /// - POST /api/onboarding/init-swarm
    /// - GET /api/engine/services
    /// - POST /api/engine/services/create
    /// - POST /api/engine/services/{id}/update?version=N
    /// - DELETE /api/engine/services/{id}
    /// - GET /api/engine/images
    /// - DELETE /api/engine/images/{id}
    pub fn router(self) -> Router {
        let guarded = Router::new()
            .route("/api/state", get(get_state))
            .route("/api/auth/credentials", put(session::rotate))
            .route("/api/onboarding/init-swarm", post(init_swarm))
            .route("/api/engine/services", get(list_services))
            .route("/api/engine/services/create", post(create_service))
            .route("/api/engine/services/{id}/update", post(update_service))
            .route("/api/engine/services/{id}", delete(delete_service))
            .route("/api/engine/images", get(list_images))
            .route("/api/engine/images/{id}", delete(delete_image))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                session::require_session,
            ));

        Router::new()
            .route("/api/auth/login", post(session::login))
            .route("/api/auth/logout", post(session::logout))
            .route("/api/hook", get(deploy_hook).post(deploy_hook))
            .merge(guarded)
            .with_state(self.state)
    }
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
struct StateResponse {
    /// Engine answered the liveness probe.
    engine: bool,
    /// Cluster object observed and adopted.
    swarm: bool,
    bootstrap: BootstrapState,
    /// Panel labels, secrets and tombstones left out.
    config: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct InitSwarmResponse {
    message: &'static str,
    #[serde(flatten)]
    report: BootstrapReport,
}

#[derive(Debug, Deserialize)]
struct UpdateQuery {
    version: u64,
}

#[derive(Debug, Deserialize)]
struct HookQuery {
    service: Option<String>,
    #[serde(rename = "deploy.image")]
    deploy_image: Option<String>,
}

#[derive(Debug, Serialize)]
struct HookResponse {
    message: String,
    #[serde(flatten)]
    report: HookReport,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/state
async fn get_state(State(state): State<Arc<PanelState>>) -> impl IntoResponse {
    let ctx = state.ctx();
    ctx.store().load().await;

    let config = ctx
        .store()
        .snapshot()
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .filter(|(k, _)| SwarmLabel::parse(k).is_some_and(|l| !l.is_secret()))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    Json(StateResponse {
        engine: ctx.engine().ping().await,
        swarm: ctx.store().is_observed(),
        bootstrap: state.bootstrap().state(),
        config,
    })
}

/// POST /api/onboarding/init-swarm
async fn init_swarm(State(state): State<Arc<PanelState>>) -> Result<impl IntoResponse, ApiError> {
    let report = state.bootstrap().run().await?;
    Ok(Json(InitSwarmResponse {
        message: report.message(),
        report,
    }))
}

/// GET /api/engine/services
async fn list_services(
    State(state): State<Arc<PanelState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.ctx().engine().list_services().await?))
}

/// POST /api/engine/services/create
async fn create_service(
    State(state): State<Arc<PanelState>>,
    Json(spec): Json<ServiceSpec>,
) -> Result<impl IntoResponse, ApiError> {
    let submitted = state
        .pipeline()
        .submit(state.ctx(), ServiceRequest::create(spec))
        .await?;
    Ok((StatusCode::CREATED, Json(submitted)))
}

/// POST /api/engine/services/{id}/update?version=N
async fn update_service(
    State(state): State<Arc<PanelState>>,
    Path(id): Path<String>,
    Query(query): Query<UpdateQuery>,
    Json(spec): Json<ServiceSpec>,
) -> Result<impl IntoResponse, ApiError> {
    if id.trim().is_empty() {
        return Err(ApiError::InvalidRequest("service id cannot be empty".into()));
    }
    let submitted = state
        .pipeline()
        .submit(state.ctx(), ServiceRequest::update(id, query.version, spec))
        .await?;
    Ok(Json(submitted))
}

/// DELETE /api/engine/services/{id}
async fn delete_service(
    State(state): State<Arc<PanelState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.ctx().engine().delete_service(&id).await?;
    info!(service = %id, "service deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/engine/images
async fn list_images(State(state): State<Arc<PanelState>>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.ctx().engine().list_images().await?))
}

/// DELETE /api/engine/images/{id}
async fn delete_image(
    State(state): State<Arc<PanelState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.ctx().engine().delete_image(&id).await?;
    info!(image = %id, "image deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET|POST /api/hook
///
/// Service and image come from the `hive-service` / `hive-deploy-image`
/// headers or the `service` / `deploy.image` query params.
async fn deploy_hook(
    State(state): State<Arc<PanelState>>,
    headers: HeaderMap,
    Query(query): Query<HookQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let service = query
        .service
        .as_deref()
        .or_else(|| header_value(&headers, "hive-service"));
    let image = query
        .deploy_image
        .as_deref()
        .or_else(|| header_value(&headers, "hive-deploy-image"));

    let report = state
        .hook()
        .trigger(header_value(&headers, header::AUTHORIZATION.as_str()), service, image)
        .await?;
    Ok(Json(HookResponse {
        message: report.message(),
        report,
    }))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
