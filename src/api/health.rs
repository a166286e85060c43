use axum::extract::State;
use axum::Json;

use super::AppState;
use crate::domain::ClubId;
use crate::error::AppError;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once the store answers a read.
pub async fn ready(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    state.store().list_seasons(&ClubId::new("")).await?;
    Ok(Json(serde_json::json!({"status": "ready"})))
}
