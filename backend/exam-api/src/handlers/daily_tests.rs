use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

use crate::error::EngineResult;
use crate::extractors::AppJson;
use crate::middlewares::auth::JwtClaims;
use crate::models::TestAnswerRequest;
use crate::services::daily_test_service::DailyTestService;
use crate::services::AppState;

use super::full_tests;

fn service(state: &AppState) -> DailyTestService {
    DailyTestService::new(state.mongo.clone(), state.config.chapter_weights.clone())
}

pub async fn start_today(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> EngineResult<impl IntoResponse> {
    let response = service(&state).start_today(&claims.sub).await?;
    Ok(Json(response))
}

pub async fn get_for_date(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(date): Path<String>,
) -> EngineResult<impl IntoResponse> {
    let response = service(&state).attempt_for_date(&claims.sub, &date).await?;
    Ok(Json(response))
}

/// Daily attempts share the answer/submit machinery with full tests.
pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<TestAnswerRequest>,
) -> EngineResult<impl IntoResponse> {
    let ack = full_tests::service(&state).answer(&claims.sub, &req).await?;
    Ok(Json(ack))
}

pub async fn submit_test(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(attempt_id): Path<String>,
) -> EngineResult<impl IntoResponse> {
    let result = full_tests::service(&state)
        .submit(&claims.sub, &attempt_id)
        .await?;
    Ok(Json(result))
}
