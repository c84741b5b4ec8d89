//! HTTP API for submitting and polling search jobs.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/search` | Submit `{id, pattern}`, returns `{job_id}` |
//! | `GET`  | `/search/{job_id}` | Job status and result |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "pattern must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `fetch_failed` (502),
//! `internal` (500).

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::app::build_orchestrator;
use crate::config::Config;
use crate::error::SearchError;
use crate::jobs::JobOrchestrator;
use crate::models::{AggregatedResult, JobSnapshot, JobStatus};

/// How often old finished jobs and expired cached results are dropped.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
struct AppState {
    jobs: Arc<JobOrchestrator>,
}

/// Starts the HTTP server on `[server].bind` and runs until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let jobs = build_orchestrator(config).await?;
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "seqsearch API listening");
    println!("seqsearch API listening on http://{}", config.server.bind);
    serve(listener, jobs).await
}

/// Serve the API on an already-bound listener.
pub async fn serve(
    listener: tokio::net::TcpListener,
    jobs: Arc<JobOrchestrator>,
) -> anyhow::Result<()> {
    let pruner = jobs.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            pruner.prune_finished();
            pruner.purge_expired_results();
        }
    });

    axum::serve(listener, router(jobs)).await?;
    Ok(())
}

pub fn router(jobs: Arc<JobOrchestrator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/search", post(handle_submit))
        .route("/search/{job_id}", get(handle_poll))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { jobs })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        let (status, code) = match &err {
            SearchError::Pattern { .. } => (StatusCode::BAD_REQUEST, "bad_request"),
            SearchError::JobNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            e if e.is_upstream() => (StatusCode::BAD_GATEWAY, "fetch_failed"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

// ============ POST /search ============

/// Sequence ids arrive either as JSON strings or as bare numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum SequenceIdField {
    Text(String),
    Number(u64),
}

impl SequenceIdField {
    fn into_string(self) -> String {
        match self {
            SequenceIdField::Text(s) => s.trim().to_string(),
            SequenceIdField::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct SubmitRequest {
    id: SequenceIdField,
    pattern: String,
}

#[derive(Serialize)]
struct SubmitResponse {
    job_id: String,
}

async fn handle_submit(
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, AppError> {
    let sequence_id = req.id.into_string();
    if sequence_id.is_empty() {
        return Err(bad_request("id must not be empty"));
    }
    if req.pattern.is_empty() {
        return Err(bad_request("pattern must not be empty"));
    }

    let job_id = state.jobs.submit(&sequence_id, &req.pattern).await?;
    Ok(Json(SubmitResponse { job_id }))
}

// ============ GET /search/{job_id} ============

/// `result` is `null` while pending, the grouped matches on success and
/// the error description on failure.
#[derive(Serialize)]
#[serde(untagged)]
enum JobResultBody {
    Matches(AggregatedResult),
    Error(String),
}

#[derive(Serialize)]
struct PollResponse {
    job_id: String,
    status: JobStatus,
    is_ready: bool,
    result: Option<JobResultBody>,
}

impl From<JobSnapshot> for PollResponse {
    fn from(snapshot: JobSnapshot) -> Self {
        let is_ready = snapshot.is_ready();
        let result = match snapshot.status {
            JobStatus::Succeeded => snapshot.result.map(JobResultBody::Matches),
            JobStatus::Failed => snapshot
                .error
                .map(|failure| JobResultBody::Error(failure.to_string())),
            JobStatus::Pending | JobStatus::Running => None,
        };
        Self {
            job_id: snapshot.job_id,
            status: snapshot.status,
            is_ready,
            result,
        }
    }
}

async fn handle_poll(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<PollResponse>, AppError> {
    let snapshot = state.jobs.poll(&job_id)?;
    Ok(Json(snapshot.into()))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
