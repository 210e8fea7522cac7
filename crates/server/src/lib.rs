//! HTTP trigger: `POST /generate-ppt` runs a generation job, `GET /health`
//! answers probes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use deckgen_service::{JobError, Outcome, ReportGenerator};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<dyn ReportGenerator>,
}

/// Errors returned to HTTP clients as `{"error": message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("No records found for the given jobid")]
    NotFound,

    #[error("{0}")]
    Internal(String),
}

impl From<JobError> for ApiError {
    fn from(e: JobError) -> Self {
        match e.outcome() {
            Outcome::Rejected => ApiError::BadRequest(e.to_string()),
            Outcome::NotFound => ApiError::NotFound,
            Outcome::Accepted | Outcome::Failed => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(msg) => {
                log::error!("Generation failed: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/generate-ppt", post(generate_ppt))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// POST /generate-ppt
///
/// Body `{"jobid": "..."}`. Generation blocks on remote calls and file I/O,
/// so it runs on the blocking pool.
async fn generate_ppt(
    State(state): State<AppState>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, ApiError> {
    let Some(job_id) = body.as_ref().and_then(|Json(body)| job_id(body)) else {
        return Err(ApiError::BadRequest("jobid is required".to_string()));
    };
    log::info!("Generating presentation for job {}", job_id);

    let generator = state.generator.clone();
    let report = tokio::task::spawn_blocking(move || generator.generate(&job_id))
        .await
        .map_err(|e| ApiError::Internal(format!("generation task failed: {}", e)))??;

    Ok(Json(json!({
        "message": "Presentation generated successfully",
        "filename": report.filename,
    })))
}

/// The job id of a request body. Numbers are accepted as ids too.
fn job_id(body: &Value) -> Option<String> {
    match body.get("jobid")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
