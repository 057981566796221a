use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

use crate::error::EngineResult;
use crate::extractors::AppJson;
use crate::middlewares::auth::JwtClaims;
use crate::models::FlashcardAnswerRequest;
use crate::services::flashcard_service::FlashcardService;
use crate::services::AppState;

pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(deck_id): Path<String>,
) -> EngineResult<impl IntoResponse> {
    let response = FlashcardService::new(state.mongo.clone())
        .start_session(&claims.sub, &deck_id)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn next_card(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(session_id): Path<String>,
) -> EngineResult<impl IntoResponse> {
    let response = FlashcardService::new(state.mongo.clone())
        .next_card(&claims.sub, &session_id)
        .await?;
    Ok(Json(response))
}

pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<FlashcardAnswerRequest>,
) -> EngineResult<impl IntoResponse> {
    let response = FlashcardService::new(state.mongo.clone())
        .answer(&claims.sub, &req)
        .await?;
    Ok(Json(response))
}
