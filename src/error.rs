use crate::orchestration::{OrchestrationError, RecomputeError};
use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<RecomputeError> for AppError {
    fn from(err: RecomputeError) -> Self {
        match err {
            RecomputeError::NoActiveFormula(_) => AppError::Conflict(err.to_string()),
            RecomputeError::MatchNotFound(_) => AppError::NotFound(err.to_string()),
            RecomputeError::Read { .. } | RecomputeError::Write { .. } => {
                AppError::Internal(err.to_string())
            }
        }
    }
}

impl From<OrchestrationError> for AppError {
    fn from(err: OrchestrationError) -> Self {
        match err {
            OrchestrationError::Recompute(inner) => inner.into(),
            OrchestrationError::InvalidFormula(_) => AppError::BadRequest(err.to_string()),
            OrchestrationError::SeasonNotFound(_) | OrchestrationError::FormulaNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            OrchestrationError::Completeness(_) | OrchestrationError::Store(_) => {
                AppError::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
