use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::domain::{ClubId, Formula, FormulaRules, FormulaVersionId, SeasonId};
use crate::error::AppError;
use crate::orchestration::{PublishOutcome, RecomputeReport};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishFormulaRequest {
    pub club_id: String,
    pub season_id: Option<String>,
    pub name: Option<String>,
    pub rules: FormulaRules,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaScopeQuery {
    pub club_id: String,
    pub season_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub formula: Formula,
    pub recomputes: Vec<SeasonRecomputeDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonRecomputeDto {
    pub season_id: SeasonId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<RecomputeReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<PublishOutcome> for PublishResponse {
    fn from(outcome: PublishOutcome) -> Self {
        let recomputes = outcome
            .recomputes
            .into_iter()
            .map(|r| {
                let (report, error) = match r.result {
                    Ok(report) => (Some(report), None),
                    Err(err) => (None, Some(err.to_string())),
                };
                SeasonRecomputeDto {
                    season_id: r.season_id,
                    report,
                    error,
                }
            })
            .collect();

        PublishResponse {
            formula: outcome.formula,
            recomputes,
        }
    }
}

pub async fn publish_formula(
    State(state): State<AppState>,
    Json(body): Json<PublishFormulaRequest>,
) -> Result<(StatusCode, Json<PublishResponse>), AppError> {
    let club_id = parse_club(&body.club_id)?;
    let season_id = parse_season(body.season_id.as_deref());
    let name = body.name.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let outcome = state
        .orchestrator
        .publish_formula(&club_id, season_id.as_ref(), name, &body.rules)
        .await?;

    Ok((StatusCode::CREATED, Json(outcome.into())))
}

/// The formula a recompute for the scope would use, after fallback.
pub async fn get_active_formula(
    Query(params): Query<FormulaScopeQuery>,
    State(state): State<AppState>,
) -> Result<Json<Formula>, AppError> {
    let club_id = parse_club(&params.club_id)?;
    let season_id = parse_season(params.season_id.as_deref());

    let formula = state
        .orchestrator
        .resolve_formula(&club_id, season_id.as_ref())
        .await?;
    Ok(Json(formula))
}

pub async fn list_formulas(
    Query(params): Query<FormulaScopeQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Formula>>, AppError> {
    let club_id = parse_club(&params.club_id)?;
    let season_id = parse_season(params.season_id.as_deref());

    let versions = state
        .store()
        .list_formula_versions(&club_id, season_id.as_ref())
        .await?;
    Ok(Json(versions))
}

/// One formula version by id, active or not.
pub async fn get_formula(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Formula>, AppError> {
    let formula = state
        .store()
        .get_formula(FormulaVersionId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("formula version {} not found", id)))?;
    Ok(Json(formula))
}

pub async fn activate_formula(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<PublishResponse>, AppError> {
    let outcome = state
        .orchestrator
        .activate_formula(FormulaVersionId::new(id))
        .await?;
    Ok(Json(outcome.into()))
}

pub(crate) fn parse_club(raw: &str) -> Result<ClubId, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("clubId is required".into()));
    }
    Ok(ClubId::new(trimmed))
}

pub(crate) fn parse_season(raw: Option<&str>) -> Option<SeasonId> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(SeasonId::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_club_rejects_blank() {
        assert!(matches!(parse_club("  "), Err(AppError::BadRequest(_))));
        assert_eq!(parse_club(" club-1 ").unwrap(), ClubId::new("club-1"));
    }

    #[test]
    fn test_blank_season_means_club_default() {
        assert_eq!(parse_season(Some("")), None);
        assert_eq!(parse_season(None), None);
        assert_eq!(parse_season(Some("2024")), Some(SeasonId::new("2024")));
    }

    #[test]
    fn test_publish_request_accepts_partial_rules() {
        let body: PublishFormulaRequest = serde_json::from_str(
            r#"{"clubId":"c1","rules":{"batting":{"per_run":1,"milestones":[{"at":50,"bonus":10}]}}}"#,
        )
        .unwrap();
        assert_eq!(body.rules.batting.per_run, 1.0);
        assert_eq!(body.rules.batting.milestones.len(), 1);
        assert_eq!(body.rules.fielding.catch, 0.0);
        assert!(body.season_id.is_none());
    }
}
