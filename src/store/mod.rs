//! Store abstraction the recompute pipeline reads cards from and writes
//! points events to.
//!
//! `db::Repository` implements it over SQLite; `MemoryStore` keeps everything
//! in process for tests and embedding callers.

use crate::domain::{
    BattingCard, BowlingCard, ClubId, DateRange, Discipline, FieldingCard, Formula, FormulaRules,
    FormulaVersionId, MatchId, MatchInfo, PlayerId, PlayerTotal, PointsEvent, Season, SeasonId,
    TeamId,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

pub mod memory;

pub use memory::MemoryStore;

/// Storage contract for formulas, fixtures, cards and points events.
///
/// Every read must tolerate empty results. `insert_events` accepts any
/// number of rows per call; callers chunk for their own reasons.
#[async_trait]
pub trait ScoringStore: Send + Sync + fmt::Debug {
    // ── Formulas ──────────────────────────────────────────────────────────

    /// The active formula scoped exactly to `(club_id, season_id)`.
    ///
    /// No fallback happens here; see `orchestration::resolver`.
    async fn active_formula(
        &self,
        club_id: &ClubId,
        season_id: Option<&SeasonId>,
    ) -> Result<Option<Formula>, StoreError>;

    async fn get_formula(&self, id: FormulaVersionId) -> Result<Option<Formula>, StoreError>;

    /// All versions for a scope, newest first.
    async fn list_formula_versions(
        &self,
        club_id: &ClubId,
        season_id: Option<&SeasonId>,
    ) -> Result<Vec<Formula>, StoreError>;

    /// Publish `rules` as the next version of `(club_id, season_id)` and make it
    /// the active one. Publishing rules identical to the active version
    /// returns that version untouched.
    async fn publish_formula(
        &self,
        club_id: &ClubId,
        season_id: Option<&SeasonId>,
        name: Option<&str>,
        rules: &FormulaRules,
    ) -> Result<Formula, StoreError>;

    /// Make an existing version the active one of its scope.
    async fn activate_formula(&self, id: FormulaVersionId) -> Result<Option<Formula>, StoreError>;

    // ── Fixtures ──────────────────────────────────────────────────────────

    async fn get_season(&self, season_id: &SeasonId) -> Result<Option<Season>, StoreError>;

    async fn list_seasons(&self, club_id: &ClubId) -> Result<Vec<Season>, StoreError>;

    async fn get_match(&self, match_id: &MatchId) -> Result<Option<MatchInfo>, StoreError>;

    /// Matches of `club_id` whose date falls inside `range` (inclusive).
    async fn list_matches(
        &self,
        club_id: &ClubId,
        range: DateRange,
    ) -> Result<Vec<MatchInfo>, StoreError>;

    // ── Cards ─────────────────────────────────────────────────────────────

    async fn list_batting_cards(&self, match_ids: &[MatchId])
        -> Result<Vec<BattingCard>, StoreError>;

    async fn list_bowling_cards(&self, match_ids: &[MatchId])
        -> Result<Vec<BowlingCard>, StoreError>;

    async fn list_fielding_cards(
        &self,
        match_ids: &[MatchId],
    ) -> Result<Vec<FieldingCard>, StoreError>;

    /// Players with a row in at least one card table for the match.
    async fn players_with_cards(&self, match_id: &MatchId) -> Result<HashSet<PlayerId>, StoreError>;

    /// Insert zero-valued rows into one card table. Returns rows inserted;
    /// existing `(match_id, player_id)` rows are left alone.
    async fn insert_zero_cards(
        &self,
        discipline: Discipline,
        match_id: &MatchId,
        team_id: Option<&TeamId>,
        player_ids: &[PlayerId],
    ) -> Result<u64, StoreError>;

    // ── Points events ─────────────────────────────────────────────────────

    async fn delete_events(
        &self,
        match_ids: &[MatchId],
        formula_version_id: FormulaVersionId,
    ) -> Result<u64, StoreError>;

    async fn insert_events(&self, rows: &[PointsEvent]) -> Result<u64, StoreError>;

    async fn list_events(
        &self,
        match_id: &MatchId,
        formula_version_id: FormulaVersionId,
    ) -> Result<Vec<PointsEvent>, StoreError>;

    /// Per-player totals over the club's matches in `range`.
    ///
    /// Every player with a card row in range is listed; missing events count
    /// as zero. Sorted by points descending, then player id.
    async fn player_totals(
        &self,
        club_id: &ClubId,
        formula_version_id: FormulaVersionId,
        range: DateRange,
    ) -> Result<Vec<PlayerTotal>, StoreError>;
}

/// Error type for store operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store read failed: {0}")]
    Read(String),
    #[error("store write failed: {0}")]
    Write(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Read("disk gone".to_string());
        assert_eq!(err.to_string(), "store read failed: disk gone");

        let err = StoreError::Write("constraint".to_string());
        assert_eq!(err.to_string(), "store write failed: constraint");
    }
}
