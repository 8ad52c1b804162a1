//! Corpus management handlers

use axum::{extract::State, Json};
use serde::Serialize;
use std::time::Instant;

use crate::AppState;
use rfpdesk_common::errors::Result;

#[derive(Serialize)]
pub struct ReloadResponse {
    pub status: String,
    pub records: usize,
    pub processing_time_ms: u64,
}

/// Refetch the corpus and atomically replace the in-memory generation
pub async fn reload(State(state): State<AppState>) -> Result<Json<ReloadResponse>> {
    let start = Instant::now();

    let records = state.service.reload_corpus().await?;
    tracing::info!(records, "Corpus reloaded via API");

    Ok(Json(ReloadResponse {
        status: "reloaded".to_string(),
        records,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}
