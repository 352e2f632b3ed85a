//! HTTP 接口：`POST /` 接收网描述并返回分析报告，每个请求独立建网、独立分析。
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::analysis::SoundnessAnalyzer;
use crate::config::AnalysisConfig;
use crate::net::{DescriptionError, FireError, NetDescription};
use crate::report::SoundnessReport;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<DescriptionError> for ApiError {
    fn from(err: DescriptionError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<FireError> for ApiError {
    fn from(err: FireError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(config: Arc<AnalysisConfig>) -> Router {
    Router::new()
        .route("/", post(analyze).options(|| async { StatusCode::OK }))
        .layer(CorsLayer::permissive())
        .with_state(config)
}

async fn analyze(
    State(config): State<Arc<AnalysisConfig>>,
    body: String,
) -> Result<Json<SoundnessReport>, ApiError> {
    let description: NetDescription = serde_json::from_str(&body)?;
    let net = description.build()?;
    log::debug!(
        "request: {} places, {} transitions",
        net.places_len(),
        net.transitions_len()
    );

    let limits = config.limits();
    let report = tokio::task::spawn_blocking(move || {
        SoundnessAnalyzer::new(limits)
            .analyze(&net)
            .map(|analysis| analysis.report(&net))
    })
    .await
    .map_err(|err| ApiError::Internal(err.to_string()))??;

    log::info!(
        "workflow net: {}, soundness: {}",
        report.workflow_net,
        report.sound
    );
    Ok(Json(report))
}

pub async fn serve(config: AnalysisConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let app = router(Arc::new(config));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    log::info!("listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    log::info!("shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Failed to install Ctrl+C handler: {err}");
        std::future::pending::<()>().await;
    }
}
