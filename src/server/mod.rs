// ABOUTME: HTTP boundary: health/greeting on GET /, authenticated uploads on POST /.
// ABOUTME: Builds the axum router and runs it until SIGINT/SIGTERM.

mod auth;
mod error;

pub use auth::{bearer_token, require_bearer, token_matches};
pub use error::ApiError;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State};
use axum::http::header;
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use bytes::Bytes;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::{Config, SecretKey};
use crate::deploy::{DeployReport, Pipeline};
use crate::diagnostics::Warning;
use crate::error::{Error, Result};

/// Multipart field carrying the archive, for form-based uploads.
pub const UPLOAD_FIELD: &str = "archive";

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub secret_key: SecretKey,
    pub index_message: Arc<str>,
    pub max_upload_size: usize,
}

impl AppState {
    pub fn new(config: &Config, pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            secret_key: config.secret_key.clone(),
            index_message: Arc::from(config.index_message.as_str()),
            max_upload_size: config.max_upload_size,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DeployResponse {
    pub message: &'static str,
    pub digest: String,
    pub extracted: bool,
    /// Number of work root entries pruned.
    pub removed: usize,
    pub warnings: Vec<Warning>,
}

impl From<DeployReport> for DeployResponse {
    fn from(report: DeployReport) -> Self {
        Self {
            message: "ok",
            digest: report.digest.to_string(),
            extracted: report.extracted,
            removed: report.removed.len(),
            warnings: report.warnings,
        }
    }
}

/// Assemble the router.
///
/// `GET /` is unauthenticated. `POST /` runs the bearer check first, then the
/// body limit, then the deploy handler.
pub fn app(state: AppState) -> Router {
    let upload = post(deploy)
        .layer(DefaultBodyLimit::max(state.max_upload_size))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .route("/", get(index).merge(upload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until a shutdown signal arrives.
pub async fn serve(config: &Config, pipeline: Pipeline) -> Result<()> {
    let state = AppState::new(config, pipeline);
    let addr = config.addr();

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| Error::Bind {
            addr: addr.clone(),
            source,
        })?;

    tracing::info!(
        addr = %addr,
        work_dir = %config.work_dir.display(),
        max_upload_size = config.max_upload_size,
        "lander listening"
    );

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

async fn index(State(state): State<AppState>) -> Json<IndexResponse> {
    Json(IndexResponse {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        message: state.index_message.to_string(),
    })
}

async fn deploy(
    State(state): State<AppState>,
    request: Request,
) -> std::result::Result<Json<DeployResponse>, ApiError> {
    let body = read_upload(request).await?;
    let pipeline = state.pipeline.clone();

    // Spawned so a client disconnect cannot cancel a deploy halfway through.
    let report = tokio::spawn(async move { pipeline.deploy(body).await })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(DeployResponse::from(report)))
}

/// Read the archive bytes from either a raw body or a multipart form.
///
/// A form without an `archive` field yields an empty upload, which the
/// pipeline rejects as missing.
async fn read_upload(request: Request) -> std::result::Result<Bytes, ApiError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    if !is_multipart {
        return Bytes::from_request(request, &())
            .await
            .map_err(|rejection| ApiError::Body {
                status: rejection.status(),
                message: rejection.body_text(),
            });
    }

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|rejection| ApiError::Body {
            status: rejection.status(),
            message: rejection.body_text(),
        })?;

    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::Body {
        status: e.status(),
        message: e.body_text(),
    })? {
        if field.name() == Some(UPLOAD_FIELD) {
            return field.bytes().await.map_err(|e| ApiError::Body {
                status: e.status(),
                message: e.body_text(),
            });
        }
    }

    Ok(Bytes::new())
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received SIGINT, shutting down");
        }
        _ = terminate() => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
