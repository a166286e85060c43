use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use super::AppState;
use crate::domain::{MatchId, SeasonId};
use crate::error::AppError;
use crate::orchestration::RecomputeReport;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeSeasonRequest {
    pub season_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeMatchRequest {
    pub match_id: String,
}

pub async fn recompute_season(
    State(state): State<AppState>,
    Json(body): Json<RecomputeSeasonRequest>,
) -> Result<Json<RecomputeReport>, AppError> {
    let season_id = body.season_id.trim();
    if season_id.is_empty() {
        return Err(AppError::BadRequest("seasonId is required".into()));
    }

    let report = state
        .orchestrator
        .recompute_season(&SeasonId::new(season_id))
        .await?;
    Ok(Json(report))
}

pub async fn recompute_match(
    State(state): State<AppState>,
    Json(body): Json<RecomputeMatchRequest>,
) -> Result<Json<RecomputeReport>, AppError> {
    let match_id = body.match_id.trim();
    if match_id.is_empty() {
        return Err(AppError::BadRequest("matchId is required".into()));
    }

    let report = state
        .orchestrator
        .recompute_match(&MatchId::new(match_id))
        .await?;
    Ok(Json(report))
}
