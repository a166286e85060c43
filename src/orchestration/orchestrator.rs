use crate::domain::{
    ClubId, Formula, FormulaError, FormulaRules, FormulaVersionId, MatchId, PlayerId, PlayerTotal,
    Season, SeasonId, TeamId,
};
use crate::orchestration::ensure::{ensure_zero_rows, CompletenessError, CompletenessReport};
use crate::orchestration::recompute::{RecomputeError, RecomputeReport, Recomputer};
use crate::orchestration::resolver::{get_active_formula, ResolveError};
use crate::store::{ScoringStore, StoreError};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Entry point for the triggers that cause recomputes: formula changes,
/// roster imports and explicit requests.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    store: Arc<dyn ScoringStore>,
    recomputer: Recomputer,
}

/// Outcome of recomputing one season after a formula change.
#[derive(Debug, Clone)]
pub struct SeasonRecompute {
    pub season_id: SeasonId,
    pub result: Result<RecomputeReport, RecomputeError>,
}

#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub formula: Formula,
    pub recomputes: Vec<SeasonRecompute>,
}

#[derive(Debug, Clone)]
pub struct RosterOutcome {
    pub completeness: CompletenessReport,
    pub recompute: RecomputeReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaderboard {
    pub season: Season,
    pub formula_version_id: FormulaVersionId,
    pub totals: Vec<PlayerTotal>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn ScoringStore>, batch_size: usize) -> Self {
        let recomputer = Recomputer::new(store.clone(), batch_size);
        Self { store, recomputer }
    }

    pub fn store(&self) -> &Arc<dyn ScoringStore> {
        &self.store
    }

    /// Recompute a season's matches under the formula active for it.
    pub async fn recompute_season(
        &self,
        season_id: &SeasonId,
    ) -> Result<RecomputeReport, OrchestrationError> {
        let season = self.season(season_id).await?;
        Ok(self
            .recomputer
            .recompute_season_points(&season.club_id, Some(&season.id), season.range())
            .await?)
    }

    pub async fn recompute_match(
        &self,
        match_id: &MatchId,
    ) -> Result<RecomputeReport, OrchestrationError> {
        Ok(self.recomputer.recompute_match(match_id).await?)
    }

    /// Validate and publish rules as the next version of their scope, then
    /// recompute every season the new version governs.
    pub async fn publish_formula(
        &self,
        club_id: &ClubId,
        season_id: Option<&SeasonId>,
        name: Option<&str>,
        rules: &FormulaRules,
    ) -> Result<PublishOutcome, OrchestrationError> {
        rules.validate()?;
        let formula = self
            .store
            .publish_formula(club_id, season_id, name, rules)
            .await?;
        let recomputes = self.on_formula_published(&formula).await?;
        Ok(PublishOutcome {
            formula,
            recomputes,
        })
    }

    /// Make an existing version active again and recompute what it governs.
    pub async fn activate_formula(
        &self,
        id: FormulaVersionId,
    ) -> Result<PublishOutcome, OrchestrationError> {
        let formula = self
            .store
            .activate_formula(id)
            .await?
            .ok_or(OrchestrationError::FormulaNotFound(id))?;
        let recomputes = self.on_formula_published(&formula).await?;
        Ok(PublishOutcome {
            formula,
            recomputes,
        })
    }

    /// Recompute the seasons affected by `formula` becoming active.
    ///
    /// A season formula affects only its season. A club default affects
    /// every club season without its own active formula. A failing season
    /// does not stop the others; each result is reported separately.
    pub async fn on_formula_published(
        &self,
        formula: &Formula,
    ) -> Result<Vec<SeasonRecompute>, OrchestrationError> {
        let seasons = self.store.list_seasons(&formula.club_id).await?;

        let mut affected = Vec::new();
        for season in seasons {
            let governs = match &formula.season_id {
                Some(scoped) => &season.id == scoped,
                None => self
                    .store
                    .active_formula(&formula.club_id, Some(&season.id))
                    .await?
                    .is_none(),
            };
            if governs {
                affected.push(season);
            }
        }

        let mut results = Vec::with_capacity(affected.len());
        for season in affected {
            let result = self
                .recomputer
                .recompute_season_points(&season.club_id, Some(&season.id), season.range())
                .await;
            if let Err(err) = &result {
                warn!(season_id = %season.id, error = %err, "Season recompute failed");
            }
            results.push(SeasonRecompute {
                season_id: season.id,
                result,
            });
        }

        info!(
            club_id = %formula.club_id,
            formula_id = %formula.id,
            seasons = results.len(),
            failed = results.iter().filter(|r| r.result.is_err()).count(),
            "Recomputed seasons for formula"
        );
        Ok(results)
    }

    /// Fill in zero rows for the roster, then recompute the match.
    pub async fn on_roster_imported(
        &self,
        match_id: &MatchId,
        team_id: Option<&TeamId>,
        player_ids: &[PlayerId],
    ) -> Result<RosterOutcome, OrchestrationError> {
        if self.store.get_match(match_id).await?.is_none() {
            return Err(RecomputeError::MatchNotFound(match_id.clone()).into());
        }

        let completeness =
            ensure_zero_rows(self.store.as_ref(), match_id, team_id, player_ids).await?;
        let recompute = self.recomputer.recompute_match(match_id).await?;

        Ok(RosterOutcome {
            completeness,
            recompute,
        })
    }

    /// Player totals for a season under the formula currently governing it.
    pub async fn leaderboard(&self, season_id: &SeasonId) -> Result<Leaderboard, OrchestrationError> {
        let season = self.season(season_id).await?;
        let formula = get_active_formula(self.store.as_ref(), &season.club_id, Some(&season.id))
            .await
            .map_err(RecomputeError::from)?;
        let totals = self
            .store
            .player_totals(&season.club_id, formula.id, season.range())
            .await?;

        Ok(Leaderboard {
            season,
            formula_version_id: formula.id,
            totals,
        })
    }

    /// The formula a recompute for this scope would use.
    pub async fn resolve_formula(
        &self,
        club_id: &ClubId,
        season_id: Option<&SeasonId>,
    ) -> Result<Formula, OrchestrationError> {
        Ok(get_active_formula(self.store.as_ref(), club_id, season_id)
            .await
            .map_err(RecomputeError::from)?)
    }

    async fn season(&self, season_id: &SeasonId) -> Result<Season, OrchestrationError> {
        self.store
            .get_season(season_id)
            .await?
            .ok_or_else(|| OrchestrationError::SeasonNotFound(season_id.clone()))
    }
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    Recompute(#[from] RecomputeError),
    #[error(transparent)]
    Completeness(#[from] CompletenessError),
    #[error(transparent)]
    InvalidFormula(#[from] FormulaError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("season not found: {0}")]
    SeasonNotFound(SeasonId),
    #[error("formula version not found: {0}")]
    FormulaNotFound(FormulaVersionId),
}

impl OrchestrationError {
    /// True when no active formula governs the requested scope.
    pub fn is_no_active_formula(&self) -> bool {
        matches!(
            self,
            OrchestrationError::Recompute(RecomputeError::NoActiveFormula(
                ResolveError::NoActiveFormula { .. }
            ))
        )
    }
}
