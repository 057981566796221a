use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

use crate::engine::scoring::MarkScheme;
use crate::error::EngineResult;
use crate::extractors::AppJson;
use crate::middlewares::auth::JwtClaims;
use crate::models::{StartTestRequest, TestAnswerRequest};
use crate::services::test_service::TestService;
use crate::services::AppState;

pub(crate) fn service(state: &AppState) -> TestService {
    TestService::new(
        state.mongo.clone(),
        state.config.chapter_weights.clone(),
        MarkScheme {
            marks_per_correct: state.config.marks_per_correct,
            negative_mark_per_wrong: state.config.negative_mark_per_wrong,
            clamp_at_zero: state.config.clamp_negative_total,
        },
    )
}

pub async fn start_test(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Query(req): Query<StartTestRequest>,
) -> EngineResult<impl IntoResponse> {
    let response = service(&state)
        .start_full_test(&claims.sub, req.total_questions)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<TestAnswerRequest>,
) -> EngineResult<impl IntoResponse> {
    let ack = service(&state).answer(&claims.sub, &req).await?;
    Ok(Json(ack))
}

pub async fn submit_test(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(attempt_id): Path<String>,
) -> EngineResult<impl IntoResponse> {
    let result = service(&state).submit(&claims.sub, &attempt_id).await?;
    Ok(Json(result))
}

pub async fn get_result(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(attempt_id): Path<String>,
) -> EngineResult<impl IntoResponse> {
    let result = service(&state).result(&claims.sub, &attempt_id).await?;
    Ok(Json(result))
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> EngineResult<impl IntoResponse> {
    let entries = service(&state).history(&claims.sub).await?;
    Ok(Json(entries))
}
