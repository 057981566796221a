use axum::{extract::State, response::IntoResponse, Extension, Json};
use std::sync::Arc;

use crate::error::EngineResult;
use crate::middlewares::auth::JwtClaims;
use crate::services::stats_service::StatsService;
use crate::services::AppState;

pub async fn my_stats(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> EngineResult<impl IntoResponse> {
    let stats = StatsService::new(state.mongo.clone())
        .get_user_stats(&claims.sub)
        .await?;
    Ok(Json(stats))
}
