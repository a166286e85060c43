use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{FormulaVersionId, PlayerId, SeasonId};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardQuery {
    pub season_id: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub season_id: SeasonId,
    pub formula_version_id: FormulaVersionId,
    pub entries: Vec<LeaderboardEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub player_id: PlayerId,
    pub matches: i64,
    pub points: f64,
}

/// Season standings under the formula currently governing the season.
///
/// Players tied on points share a rank.
pub async fn get_leaderboard(
    Query(params): Query<LeaderboardQuery>,
    State(state): State<AppState>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let season_id = params
        .season_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("seasonId is required".to_string()))?;

    let board = state
        .orchestrator
        .leaderboard(&SeasonId::new(season_id))
        .await?;

    let mut entries = rank_entries(board.totals.into_iter().map(|t| (t.player_id, t.matches, t.points)));
    if let Some(limit) = params.limit {
        entries.truncate(limit);
    }

    Ok(Json(LeaderboardResponse {
        season_id: board.season.id,
        formula_version_id: board.formula_version_id,
        entries,
    }))
}

/// Assign competition ranks (1, 2, 2, 4) to totals already sorted by points.
fn rank_entries(totals: impl Iterator<Item = (PlayerId, i64, f64)>) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = Vec::new();
    for (idx, (player_id, matches, points)) in totals.enumerate() {
        let rank = match entries.last() {
            Some(prev) if prev.points == points => prev.rank,
            _ => idx as i64 + 1,
        };
        entries.push(LeaderboardEntry {
            rank,
            player_id,
            matches,
            points,
        });
    }
    entries
}
