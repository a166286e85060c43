//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `formulas.rs` - Formula publishing, activation and lookup
//! - `cards.rs` - Batting/bowling/fielding card rows
//! - `events.rs` - Points event replace and aggregation
//!
//! Fixture (season/match) operations live here, together with the
//! `ScoringStore` implementation that maps `sqlx` errors onto the store's
//! read/write taxonomy.

mod cards;
mod events;
mod formulas;

use crate::domain::{
    BattingCard, BowlingCard, ClubId, DateRange, Discipline, FieldingCard, Formula, FormulaRules,
    FormulaVersionId, MatchId, MatchInfo, PlayerId, PlayerTotal, PointsEvent, Season, SeasonId,
    TeamId,
};
use crate::store::{ScoringStore, StoreError};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::collections::HashSet;

/// SQLite has a 999 parameter limit; chunk to 500 for safety margin.
const IN_CHUNK_SIZE: usize = 500;

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    // =========================================================================
    // Season operations
    // =========================================================================

    /// Insert or replace a season.
    pub async fn upsert_season(&self, season: &Season) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO seasons (id, club_id, name, start_date, end_date)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                club_id = excluded.club_id,
                name = excluded.name,
                start_date = excluded.start_date,
                end_date = excluded.end_date
            "#,
        )
        .bind(season.id.as_str())
        .bind(season.club_id.as_str())
        .bind(&season.name)
        .bind(season.start_date.to_string())
        .bind(season.end_date.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn query_season(&self, season_id: &SeasonId) -> Result<Option<Season>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, club_id, name, start_date, end_date FROM seasons WHERE id = ?",
        )
        .bind(season_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(season_from_row).transpose()
    }

    pub async fn query_seasons(&self, club_id: &ClubId) -> Result<Vec<Season>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, club_id, name, start_date, end_date
            FROM seasons
            WHERE club_id = ?
            ORDER BY start_date ASC, id ASC
            "#,
        )
        .bind(club_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(season_from_row).collect()
    }

    // =========================================================================
    // Match operations
    // =========================================================================

    /// Insert or replace a match.
    pub async fn upsert_match(&self, info: &MatchInfo) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO matches (id, club_id, season_id, team_id, match_date, opponent)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                club_id = excluded.club_id,
                season_id = excluded.season_id,
                team_id = excluded.team_id,
                match_date = excluded.match_date,
                opponent = excluded.opponent
            "#,
        )
        .bind(info.id.as_str())
        .bind(info.club_id.as_str())
        .bind(info.season_id.as_ref().map(|s| s.as_str()))
        .bind(info.team_id.as_ref().map(|t| t.as_str()))
        .bind(info.match_date.to_string())
        .bind(info.opponent.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn query_match(&self, match_id: &MatchId) -> Result<Option<MatchInfo>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, club_id, season_id, team_id, match_date, opponent
            FROM matches
            WHERE id = ?
            "#,
        )
        .bind(match_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    /// Matches of a club with `match_date` inside the inclusive range.
    ///
    /// Dates are stored as ISO `YYYY-MM-DD` text, so string comparison orders
    /// them chronologically.
    pub async fn query_matches(
        &self,
        club_id: &ClubId,
        range: DateRange,
    ) -> Result<Vec<MatchInfo>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, club_id, season_id, team_id, match_date, opponent
            FROM matches
            WHERE club_id = ? AND match_date >= ? AND match_date <= ?
            ORDER BY match_date ASC, id ASC
            "#,
        )
        .bind(club_id.as_str())
        .bind(range.start.to_string())
        .bind(range.end.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(match_from_row).collect()
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, sqlx::Error> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn season_from_row(row: &SqliteRow) -> Result<Season, sqlx::Error> {
    let start: String = row.get("start_date");
    let end: String = row.get("end_date");
    Ok(Season {
        id: SeasonId::new(row.get::<String, _>("id")),
        club_id: ClubId::new(row.get::<String, _>("club_id")),
        name: row.get("name"),
        start_date: parse_date(&start)?,
        end_date: parse_date(&end)?,
    })
}

fn match_from_row(row: &SqliteRow) -> Result<MatchInfo, sqlx::Error> {
    let date: String = row.get("match_date");
    Ok(MatchInfo {
        id: MatchId::new(row.get::<String, _>("id")),
        club_id: ClubId::new(row.get::<String, _>("club_id")),
        season_id: row.get::<Option<String>, _>("season_id").map(SeasonId::new),
        team_id: row.get::<Option<String>, _>("team_id").map(TeamId::new),
        match_date: parse_date(&date)?,
        opponent: row.get("opponent"),
    })
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

fn read_err(err: sqlx::Error) -> StoreError {
    StoreError::Read(err.to_string())
}

fn write_err(err: sqlx::Error) -> StoreError {
    StoreError::Write(err.to_string())
}

#[async_trait]
impl ScoringStore for Repository {
    async fn active_formula(
        &self,
        club_id: &ClubId,
        season_id: Option<&SeasonId>,
    ) -> Result<Option<Formula>, StoreError> {
        self.query_active_formula(club_id, season_id)
            .await
            .map_err(read_err)
    }

    async fn get_formula(&self, id: FormulaVersionId) -> Result<Option<Formula>, StoreError> {
        self.query_formula(id).await.map_err(read_err)
    }

    async fn list_formula_versions(
        &self,
        club_id: &ClubId,
        season_id: Option<&SeasonId>,
    ) -> Result<Vec<Formula>, StoreError> {
        self.query_formula_versions(club_id, season_id)
            .await
            .map_err(read_err)
    }

    async fn publish_formula(
        &self,
        club_id: &ClubId,
        season_id: Option<&SeasonId>,
        name: Option<&str>,
        rules: &FormulaRules,
    ) -> Result<Formula, StoreError> {
        self.insert_formula_version(club_id, season_id, name, rules)
            .await
            .map_err(write_err)
    }

    async fn activate_formula(&self, id: FormulaVersionId) -> Result<Option<Formula>, StoreError> {
        self.set_active_formula(id).await.map_err(write_err)
    }

    async fn get_season(&self, season_id: &SeasonId) -> Result<Option<Season>, StoreError> {
        self.query_season(season_id).await.map_err(read_err)
    }

    async fn list_seasons(&self, club_id: &ClubId) -> Result<Vec<Season>, StoreError> {
        self.query_seasons(club_id).await.map_err(read_err)
    }

    async fn get_match(&self, match_id: &MatchId) -> Result<Option<MatchInfo>, StoreError> {
        self.query_match(match_id).await.map_err(read_err)
    }

    async fn list_matches(
        &self,
        club_id: &ClubId,
        range: DateRange,
    ) -> Result<Vec<MatchInfo>, StoreError> {
        self.query_matches(club_id, range).await.map_err(read_err)
    }

    async fn list_batting_cards(
        &self,
        match_ids: &[MatchId],
    ) -> Result<Vec<BattingCard>, StoreError> {
        self.query_batting_cards(match_ids).await.map_err(read_err)
    }

    async fn list_bowling_cards(
        &self,
        match_ids: &[MatchId],
    ) -> Result<Vec<BowlingCard>, StoreError> {
        self.query_bowling_cards(match_ids).await.map_err(read_err)
    }

    async fn list_fielding_cards(
        &self,
        match_ids: &[MatchId],
    ) -> Result<Vec<FieldingCard>, StoreError> {
        self.query_fielding_cards(match_ids).await.map_err(read_err)
    }

    async fn players_with_cards(&self, match_id: &MatchId) -> Result<HashSet<PlayerId>, StoreError> {
        self.query_players_with_cards(match_id)
            .await
            .map_err(read_err)
    }

    async fn insert_zero_cards(
        &self,
        discipline: Discipline,
        match_id: &MatchId,
        team_id: Option<&TeamId>,
        player_ids: &[PlayerId],
    ) -> Result<u64, StoreError> {
        self.insert_zero_card_rows(discipline, match_id, team_id, player_ids)
            .await
            .map_err(write_err)
    }

    async fn delete_events(
        &self,
        match_ids: &[MatchId],
        formula_version_id: FormulaVersionId,
    ) -> Result<u64, StoreError> {
        self.delete_points_events(match_ids, formula_version_id)
            .await
            .map_err(write_err)
    }

    async fn insert_events(&self, rows: &[PointsEvent]) -> Result<u64, StoreError> {
        self.insert_points_events_batch(rows)
            .await
            .map_err(write_err)
    }

    async fn list_events(
        &self,
        match_id: &MatchId,
        formula_version_id: FormulaVersionId,
    ) -> Result<Vec<PointsEvent>, StoreError> {
        self.query_points_events(match_id, formula_version_id)
            .await
            .map_err(read_err)
    }

    async fn player_totals(
        &self,
        club_id: &ClubId,
        formula_version_id: FormulaVersionId,
        range: DateRange,
    ) -> Result<Vec<PlayerTotal>, StoreError> {
        self.query_player_totals(club_id, formula_version_id, range)
            .await
            .map_err(read_err)
    }
}
