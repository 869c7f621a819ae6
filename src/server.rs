//! HTTP surface: `GET /` renders and publishes, `GET /health` reports liveness.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::config::Config;
use crate::foundation::error::ReelError;
use crate::pipeline::{JobFailure, Orchestrator, RenderResponse, Stage};
use crate::request::RenderRequest;

/// Shared state of every request handler.
pub struct AppState {
    orchestrator: Orchestrator,
    job_timeout: Option<Duration>,
}

impl AppState {
    /// Serve jobs through `orchestrator`, cutting each off after `job_timeout`.
    pub fn new(orchestrator: Orchestrator, job_timeout: Option<Duration>) -> Self {
        Self {
            orchestrator,
            job_timeout,
        }
    }
}

#[derive(serde::Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn render(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let request = RenderRequest::from_pairs(params);
    let job = state.orchestrator.produce(request);

    let res = match state.job_timeout {
        Some(limit) => tokio::time::timeout(limit, job).await.unwrap_or_else(|_| {
            Err(JobFailure::new(
                Stage::Timeout,
                ReelError::timeout(format!("exceeded {}s", limit.as_secs())),
            ))
        }),
        None => job.await,
    };

    match res {
        Ok(resp) => render_response(resp),
        Err(failure) => failure_response(&failure),
    }
}

fn render_response(resp: RenderResponse) -> Response {
    let status = StatusCode::from_u16(resp.status.http_status()).unwrap_or(StatusCode::OK);
    (status, Json(resp)).into_response()
}

fn failure_response(failure: &JobFailure) -> Response {
    tracing::warn!(stage = %failure.stage, error = %failure.error, "job failed");
    let status = StatusCode::from_u16(failure.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(failure.to_json())).into_response()
}

/// Build the router. Used by `serve` and the integration tests.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(render))
        .route("/health", get(health))
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn serve(cfg: &Config) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::from_config(cfg)?;
    tracing::info!(
        cache = ?orchestrator.cache_mode(),
        scene = %cfg.scene_id,
        max_jobs = cfg.max_jobs(),
        "orchestrator ready"
    );
    let state = Arc::new(AppState::new(orchestrator, cfg.job_timeout()));

    let listener = tokio::net::TcpListener::bind(cfg.socket_addr()).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
