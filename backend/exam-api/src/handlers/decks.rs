use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

use crate::error::EngineResult;
use crate::middlewares::auth::JwtClaims;
use crate::services::deck_service::DeckService;
use crate::services::AppState;

pub async fn list_decks(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> EngineResult<impl IntoResponse> {
    let decks = DeckService::new(state.mongo.clone())
        .list_decks(&claims.sub)
        .await?;
    Ok(Json(decks))
}

pub async fn get_deck(
    State(state): State<Arc<AppState>>,
    Path(deck_id): Path<String>,
) -> EngineResult<impl IntoResponse> {
    let deck = DeckService::new(state.mongo.clone())
        .deck_detail(&deck_id)
        .await?;
    Ok(Json(deck))
}

pub async fn mark_viewed(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(deck_id): Path<String>,
) -> EngineResult<impl IntoResponse> {
    DeckService::new(state.mongo.clone())
        .mark_viewed(&deck_id, &claims.sub)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
