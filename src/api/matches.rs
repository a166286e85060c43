use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::AppState;
use crate::domain::{FormulaVersionId, MatchId, PlayerId, PointsEvent, TeamId};
use crate::error::AppError;
use crate::orchestration::{CompletenessReport, RecomputeReport};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterRequest {
    pub team_id: Option<String>,
    pub player_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterResponse {
    pub completeness: CompletenessReport,
    pub recompute: RecomputeReport,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPointsQuery {
    pub formula_version_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPointsResponse {
    pub match_id: MatchId,
    pub formula_version_id: FormulaVersionId,
    pub totals: Vec<PlayerPoints>,
    pub events: Vec<PointsEvent>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPoints {
    pub player_id: PlayerId,
    pub points: f64,
}

/// Record the full roster of a match, fill in zero rows and recompute it.
pub async fn import_roster(
    Path(match_id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<RosterRequest>,
) -> Result<Json<RosterResponse>, AppError> {
    let match_id = MatchId::new(match_id);
    let team_id = body
        .team_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(TeamId::new);
    let player_ids: Vec<PlayerId> = body
        .player_ids
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(PlayerId::new)
        .collect();
    if player_ids.is_empty() {
        return Err(AppError::BadRequest("playerIds must not be empty".into()));
    }

    let outcome = state
        .orchestrator
        .on_roster_imported(&match_id, team_id.as_ref(), &player_ids)
        .await?;

    Ok(Json(RosterResponse {
        completeness: outcome.completeness,
        recompute: outcome.recompute,
    }))
}

/// Stored events for a match, with per-player sums.
///
/// Without `formulaVersionId` the formula currently governing the match is
/// used.
pub async fn get_match_points(
    Path(match_id): Path<String>,
    Query(params): Query<MatchPointsQuery>,
    State(state): State<AppState>,
) -> Result<Json<MatchPointsResponse>, AppError> {
    let match_id = MatchId::new(match_id);
    let info = state
        .store()
        .get_match(&match_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("match {}", match_id)))?;

    let formula_version_id = match params.formula_version_id {
        Some(id) => FormulaVersionId::new(id),
        None => {
            state
                .orchestrator
                .resolve_formula(&info.club_id, info.season_id.as_ref())
                .await?
                .id
        }
    };

    let events = state
        .store()
        .list_events(&match_id, formula_version_id)
        .await?;

    let mut sums: BTreeMap<&PlayerId, f64> = BTreeMap::new();
    for event in &events {
        *sums.entry(&event.player_id).or_default() += event.points;
    }
    let totals = sums
        .into_iter()
        .map(|(player_id, points)| PlayerPoints {
            player_id: player_id.clone(),
            points,
        })
        .collect();

    Ok(Json(MatchPointsResponse {
        match_id,
        formula_version_id,
        totals,
        events,
    }))
}
