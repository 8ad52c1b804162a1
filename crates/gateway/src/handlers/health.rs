//! Health check handlers

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub corpus: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<usize>,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness probe - reports whether the corpus is loaded
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let corpus_check = match state.service.corpus_size().await {
        Some(records) => CheckResult {
            status: "loaded".to_string(),
            records: Some(records),
        },
        None => CheckResult {
            status: "not_loaded".to_string(),
            records: None,
        },
    };

    let ready = corpus_check.status == "loaded";

    Json(ReadyResponse {
        status: if ready { "ready" } else { "not_ready" }.to_string(),
        checks: HealthChecks {
            corpus: corpus_check,
        },
    })
}
