mod config;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::{error, info, warn};

use hive_api::{HttpApi, PanelState};
use hive_core::prelude::*;
use hive_observe::{LoggerTimeZone, init_local_offset, init_logger};
use hive_prometheus::PrometheusMetrics;

use crate::config::DaemonConfig;

fn main() -> anyhow::Result<()> {
    // 1) config
    let cfg = DaemonConfig::load(|k| std::env::var(k).ok())?;

    // 2) logger; the local offset has to be read before any runtime thread exists
    if cfg.logger.tz == LoggerTimeZone::Local {
        init_local_offset();
    }
    init_logger(&cfg.logger)?;
    info!(engine = %cfg.panel.engine_url, port = cfg.panel.port, "logger initialized");

    // 3) runtime
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?
        .block_on(run(cfg))
}

async fn run(cfg: DaemonConfig) -> anyhow::Result<()> {
    // 4) context
    let engine = Arc::new(HttpEngine::new(&cfg.panel.engine_url, cfg.panel.engine_timeout())?);
    let metrics = PrometheusMetrics::new()?;
    let ctx = Context::new(engine, cfg.panel.clone(), Arc::new(metrics.clone()));

    // 5) label store; the engine often starts after us
    let mut outcome = ctx.store().load().await;
    for attempt in 1..cfg.panel.bootstrap_attempts {
        if outcome.engine_answered() {
            break;
        }
        warn!(attempt, "engine unreachable; waiting before reading configuration");
        tokio::time::sleep(cfg.panel.bootstrap_poll()).await;
        outcome = ctx.store().load().await;
    }
    match &outcome {
        LoadOutcome::Observed(cluster) => {
            info!(version = cluster.version.index, "cluster object adopted")
        }
        LoadOutcome::NotObserved => {
            warn!("no cluster observed; configuration is buffered until onboarding")
        }
        LoadOutcome::Unreachable => {
            warn!("engine still unreachable; existing cluster credentials win once it answers")
        }
    }

    // 6) first-boot credential, shown once and never logged
    let state = Arc::new(PanelState::new(ctx.clone()));
    if let Some(cred) = state.auth().ensure_bootstrap_credential() {
        println!(
            "hive panel: sign in as {} with the one-time secret {}",
            cred.identity,
            cred.secret()
        );
    }

    // 7) http
    let app = HttpApi::new(state).router().merge(metrics_router(metrics));
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.panel.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "panel listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving http")?;

    ctx.store().flush().await;
    info!("panel stopped");
    Ok(())
}

fn metrics_router(metrics: PrometheusMetrics) -> Router {
    Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(metrics)
}

/// GET /metrics
async fn render_metrics(State(metrics): State<PrometheusMetrics>) -> Response {
    match metrics.render() {
        Ok(body) => ([(header::CONTENT_TYPE, metrics.content_type())], body).into_response(),
        Err(e) => {
            error!(error = %e, "metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "ctrl-c handler failed; shutting down");
    }
    info!("shutdown requested");
}
