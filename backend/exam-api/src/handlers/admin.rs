use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::services::deck_service::DeckService;
use crate::services::stats_service::StatsService;
use crate::services::AppState;

/// Accepts the raw CSV file as the request body.
pub async fn import_questions(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> EngineResult<impl IntoResponse> {
    if body.is_empty() {
        return Err(EngineError::Validation("empty CSV upload".to_string()));
    }
    let summary = DeckService::new(state.mongo.clone())
        .import_csv(&body)
        .await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

pub async fn bank_stats(State(state): State<Arc<AppState>>) -> EngineResult<impl IntoResponse> {
    let stats = StatsService::new(state.mongo.clone()).bank_stats().await?;
    Ok(Json(stats))
}
