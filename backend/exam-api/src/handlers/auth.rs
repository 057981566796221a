use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use std::sync::Arc;
use validator::Validate;

use crate::error::{EngineError, EngineResult};
use crate::extractors::AppJson;
use crate::middlewares::auth::JwtClaims;
use crate::models::{LoginRequest, RegisterRequest};
use crate::services::auth_service::AuthService;
use crate::services::AppState;

fn service(state: &AppState) -> AuthService {
    AuthService::new(state.mongo.clone(), state.config.jwt_secret.clone())
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> EngineResult<impl IntoResponse> {
    req.validate()
        .map_err(|e| EngineError::Validation(e.to_string()))?;
    let token = service(&state).register(&req.email, &req.password).await?;
    Ok((StatusCode::CREATED, Json(token)))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> EngineResult<impl IntoResponse> {
    req.validate()
        .map_err(|e| EngineError::Validation(e.to_string()))?;
    let token = service(&state).login(&req.email, &req.password).await?;
    Ok(Json(token))
}

pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> EngineResult<impl IntoResponse> {
    let profile = service(&state).current_user(&claims.sub).await?;
    Ok(Json(profile))
}
