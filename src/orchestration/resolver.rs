//! Active formula resolution with season → club-default fallback.

use crate::domain::{ClubId, Formula, SeasonId};
use crate::store::{ScoringStore, StoreError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no active formula for club {club_id} (season {})", season_label(.season_id))]
    NoActiveFormula {
        club_id: ClubId,
        season_id: Option<SeasonId>,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn season_label(season_id: &Option<SeasonId>) -> &str {
    season_id.as_ref().map(|s| s.as_str()).unwrap_or("default")
}

/// Resolve the formula a recompute for `(club_id, season_id)` runs against.
///
/// A season-scoped active formula wins; otherwise the club-wide default is
/// used. With no season given only the club default is considered.
pub async fn get_active_formula(
    store: &dyn ScoringStore,
    club_id: &ClubId,
    season_id: Option<&SeasonId>,
) -> Result<Formula, ResolveError> {
    if let Some(season) = season_id {
        if let Some(formula) = store.active_formula(club_id, Some(season)).await? {
            debug!(club_id = %club_id, season_id = %season, formula_id = %formula.id, "Resolved season formula");
            return Ok(formula);
        }
    }

    match store.active_formula(club_id, None).await? {
        Some(formula) => {
            debug!(club_id = %club_id, formula_id = %formula.id, "Resolved club default formula");
            Ok(formula)
        }
        None => Err(ResolveError::NoActiveFormula {
            club_id: club_id.clone(),
            season_id: season_id.cloned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FormulaRules;
    use crate::store::MemoryStore;

    fn rules(per_run: f64) -> FormulaRules {
        let mut rules = FormulaRules::default();
        rules.batting.per_run = per_run;
        rules
    }

    #[tokio::test]
    async fn test_season_formula_preferred() {
        let store = MemoryStore::new();
        let club = ClubId::new("club-1");
        let season = SeasonId::new("2024");
        store.publish_formula(&club, None, None, &rules(1.0)).await.unwrap();
        let seasonal = store
            .publish_formula(&club, Some(&season), None, &rules(2.0))
            .await
            .unwrap();

        let resolved = get_active_formula(&store, &club, Some(&season)).await.unwrap();
        assert_eq!(resolved.id, seasonal.id);
    }

    #[tokio::test]
    async fn test_falls_back_to_club_default() {
        let store = MemoryStore::new();
        let club = ClubId::new("club-1");
        let default = store.publish_formula(&club, None, None, &rules(1.0)).await.unwrap();

        let resolved = get_active_formula(&store, &club, Some(&SeasonId::new("2024")))
            .await
            .unwrap();
        assert_eq!(resolved.id, default.id);

        let resolved = get_active_formula(&store, &club, None).await.unwrap();
        assert_eq!(resolved.id, default.id);
    }

    #[tokio::test]
    async fn test_no_active_formula() {
        let store = MemoryStore::new();
        let club = ClubId::new("club-1");
        store
            .publish_formula(&ClubId::new("other"), None, None, &rules(1.0))
            .await
            .unwrap();

        let err = get_active_formula(&store, &club, Some(&SeasonId::new("2024")))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::NoActiveFormula {
                club_id: club,
                season_id: Some(SeasonId::new("2024")),
            }
        );
    }
}
