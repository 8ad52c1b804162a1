//! Search and chat handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

use crate::AppState;
use rfpdesk_common::errors::{AppError, Result};
use rfpdesk_retrieval::service::MatchSummary;

/// Query payload shared by search and chat
///
/// Empty queries are allowed through: the service answers them with the
/// empty grouping or the fixed no-answer message rather than a 400.
#[derive(Debug, Deserialize, Validate)]
pub struct QueryRequest {
    #[validate(length(max = 1000))]
    pub query: String,
}

/// Grouped search response
#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub direct: Vec<MatchSummary>,
    pub fuzzy: Vec<MatchSummary>,
    pub contextual: Vec<MatchSummary>,
    pub processing_time_ms: u64,
}

/// Chat response: one merged, gated answer
#[derive(Serialize)]
pub struct ChatResponse {
    pub query: String,
    pub answer: String,
    pub processing_time_ms: u64,
}

/// Grouped per-matcher search
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<SearchResponse>> {
    let start = Instant::now();

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("query".to_string()),
    })?;

    let grouped = state.service.search(&request.query).await?;

    Ok(Json(SearchResponse {
        query: request.query,
        direct: grouped.direct,
        fuzzy: grouped.fuzzy,
        contextual: grouped.contextual,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}

/// Single gated natural-language answer
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<ChatResponse>> {
    let start = Instant::now();

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("query".to_string()),
    })?;

    let answer = state.service.chat(&request.query).await?;

    Ok(Json(ChatResponse {
        query: request.query,
        answer,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}
