use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy shared by every service. Each variant maps to a distinct
/// machine-readable kind so clients can branch without parsing messages.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Answer arrived out of order or against a stale queue head. Clients
    /// should refetch the current question and retry.
    #[error("{0}")]
    Sequence(String),

    /// Operation against a completed session or an already submitted attempt.
    #[error("{0}")]
    InvalidState(String),

    #[error("requested {requested} questions but only {available} are available")]
    InsufficientQuestions { requested: u32, available: u32 },

    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation",
            EngineError::NotFound(_) => "not_found",
            EngineError::Sequence(_) => "sequence",
            EngineError::InvalidState(_) => "invalid_state",
            EngineError::InsufficientQuestions { .. } => "insufficient_questions",
            EngineError::Unauthorized(_) => "unauthorized",
            EngineError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Sequence(_) | EngineError::InvalidState(_) => StatusCode::CONFLICT,
            EngineError::InsufficientQuestions { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        if let EngineError::Internal(ref source) = self {
            tracing::error!("internal error: {:#}", source);
        }
        let body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<mongodb::error::Error> for EngineError {
    fn from(err: mongodb::error::Error) -> Self {
        EngineError::Internal(anyhow::Error::new(err))
    }
}
