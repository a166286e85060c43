//! Zero-row completeness guarantee for imported rosters.

use crate::domain::{Discipline, MatchId, PlayerId, TeamId};
use crate::store::{ScoringStore, StoreError};
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletenessReport {
    /// Roster players that had no card row in any discipline.
    pub missing_players: Vec<PlayerId>,
    /// Rows actually written across all three tables.
    pub rows_inserted: u64,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompletenessError {
    #[error("completeness check failed reading cards: {0}")]
    Read(StoreError),
    #[error("completeness check failed writing {discipline} zero rows: {source}")]
    Write {
        discipline: Discipline,
        source: StoreError,
    },
}

/// Make sure every roster player has a row in each discipline table.
///
/// Players with no row in any table get an explicit zero row in all three.
/// Players with at least one existing row are left untouched. Running it
/// again with the same roster inserts nothing.
pub async fn ensure_zero_rows(
    store: &dyn ScoringStore,
    match_id: &MatchId,
    team_id: Option<&TeamId>,
    player_ids: &[PlayerId],
) -> Result<CompletenessReport, CompletenessError> {
    let existing = store
        .players_with_cards(match_id)
        .await
        .map_err(CompletenessError::Read)?;

    let missing: Vec<PlayerId> = player_ids
        .iter()
        .filter(|p| !existing.contains(*p))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if missing.is_empty() {
        debug!(match_id = %match_id, roster = player_ids.len(), "Roster already complete");
        return Ok(CompletenessReport::default());
    }

    let mut rows_inserted = 0;
    for discipline in Discipline::ALL {
        rows_inserted += store
            .insert_zero_cards(discipline, match_id, team_id, &missing)
            .await
            .map_err(|source| CompletenessError::Write { discipline, source })?;
    }

    info!(
        match_id = %match_id,
        missing = missing.len(),
        rows_inserted,
        "Inserted zero card rows"
    );

    Ok(CompletenessReport {
        missing_players: missing,
        rows_inserted,
    })
}
