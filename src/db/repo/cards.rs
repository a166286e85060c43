//! Batting, bowling and fielding card operations.
//!
//! Each card table is keyed by `(match_id, player_id)`, so a player has at
//! most one row per discipline per match.

use crate::domain::{
    BattingCard, BowlingCard, Discipline, Dismissal, FieldingCard, MatchId, PlayerId, TeamId,
};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::collections::HashSet;

use super::{placeholders, Repository, IN_CHUNK_SIZE};

impl Repository {
    /// Insert or replace batting cards in a single transaction.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn upsert_batting_cards(&self, cards: &[BattingCard]) -> Result<(), sqlx::Error> {
        if cards.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for card in cards {
            sqlx::query(
                r#"
                INSERT INTO batting_cards
                (match_id, player_id, team_id, runs, balls, fours, sixes, dismissal)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(match_id, player_id) DO UPDATE SET
                    team_id = excluded.team_id,
                    runs = excluded.runs,
                    balls = excluded.balls,
                    fours = excluded.fours,
                    sixes = excluded.sixes,
                    dismissal = excluded.dismissal
                "#,
            )
            .bind(card.match_id.as_str())
            .bind(card.player_id.as_str())
            .bind(card.team_id.as_ref().map(|t| t.as_str()))
            .bind(card.runs)
            .bind(card.balls)
            .bind(card.fours)
            .bind(card.sixes)
            .bind(card.dismissal.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Insert or replace bowling cards in a single transaction.
    pub async fn upsert_bowling_cards(&self, cards: &[BowlingCard]) -> Result<(), sqlx::Error> {
        if cards.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for card in cards {
            sqlx::query(
                r#"
                INSERT INTO bowling_cards
                (match_id, player_id, team_id, overs, maidens, runs_conceded, wickets)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(match_id, player_id) DO UPDATE SET
                    team_id = excluded.team_id,
                    overs = excluded.overs,
                    maidens = excluded.maidens,
                    runs_conceded = excluded.runs_conceded,
                    wickets = excluded.wickets
                "#,
            )
            .bind(card.match_id.as_str())
            .bind(card.player_id.as_str())
            .bind(card.team_id.as_ref().map(|t| t.as_str()))
            .bind(card.overs)
            .bind(card.maidens)
            .bind(card.runs_conceded)
            .bind(card.wickets)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Insert or replace fielding cards in a single transaction.
    pub async fn upsert_fielding_cards(&self, cards: &[FieldingCard]) -> Result<(), sqlx::Error> {
        if cards.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for card in cards {
            sqlx::query(
                r#"
                INSERT INTO fielding_cards
                (match_id, player_id, team_id, catches, stumpings, runouts, drops, misfields)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(match_id, player_id) DO UPDATE SET
                    team_id = excluded.team_id,
                    catches = excluded.catches,
                    stumpings = excluded.stumpings,
                    runouts = excluded.runouts,
                    drops = excluded.drops,
                    misfields = excluded.misfields
                "#,
            )
            .bind(card.match_id.as_str())
            .bind(card.player_id.as_str())
            .bind(card.team_id.as_ref().map(|t| t.as_str()))
            .bind(card.catches)
            .bind(card.stumpings)
            .bind(card.runouts)
            .bind(card.drops)
            .bind(card.misfields)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Batting cards for all given matches, chunked to stay under the
    /// parameter limit.
    pub async fn query_batting_cards(
        &self,
        match_ids: &[MatchId],
    ) -> Result<Vec<BattingCard>, sqlx::Error> {
        let rows = self
            .fetch_cards_in(
                "match_id, player_id, team_id, runs, balls, fours, sixes, dismissal",
                "batting_cards",
                match_ids,
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let dismissal = text(row, "dismissal");
                BattingCard {
                    match_id: MatchId::new(row.get::<String, _>("match_id")),
                    player_id: PlayerId::new(row.get::<String, _>("player_id")),
                    team_id: team_from_row(row),
                    runs: stat(row, "runs"),
                    balls: stat(row, "balls"),
                    fours: stat(row, "fours"),
                    sixes: stat(row, "sixes"),
                    dismissal: dismissal.as_deref().map(Dismissal::from).unwrap_or_default(),
                }
            })
            .collect())
    }

    pub async fn query_bowling_cards(
        &self,
        match_ids: &[MatchId],
    ) -> Result<Vec<BowlingCard>, sqlx::Error> {
        let rows = self
            .fetch_cards_in(
                "match_id, player_id, team_id, overs, maidens, runs_conceded, wickets",
                "bowling_cards",
                match_ids,
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| BowlingCard {
                match_id: MatchId::new(row.get::<String, _>("match_id")),
                player_id: PlayerId::new(row.get::<String, _>("player_id")),
                team_id: team_from_row(row),
                overs: stat(row, "overs"),
                maidens: stat(row, "maidens"),
                runs_conceded: stat(row, "runs_conceded"),
                wickets: stat(row, "wickets"),
            })
            .collect())
    }

    pub async fn query_fielding_cards(
        &self,
        match_ids: &[MatchId],
    ) -> Result<Vec<FieldingCard>, sqlx::Error> {
        let rows = self
            .fetch_cards_in(
                "match_id, player_id, team_id, catches, stumpings, runouts, drops, misfields",
                "fielding_cards",
                match_ids,
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| FieldingCard {
                match_id: MatchId::new(row.get::<String, _>("match_id")),
                player_id: PlayerId::new(row.get::<String, _>("player_id")),
                team_id: team_from_row(row),
                catches: stat(row, "catches"),
                stumpings: stat(row, "stumpings"),
                runouts: stat(row, "runouts"),
                drops: stat(row, "drops"),
                misfields: stat(row, "misfields"),
            })
            .collect())
    }

    /// Players with a row in any of the three card tables for a match.
    pub async fn query_players_with_cards(
        &self,
        match_id: &MatchId,
    ) -> Result<HashSet<PlayerId>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT player_id FROM batting_cards WHERE match_id = ?
            UNION
            SELECT player_id FROM bowling_cards WHERE match_id = ?
            UNION
            SELECT player_id FROM fielding_cards WHERE match_id = ?
            "#,
        )
        .bind(match_id.as_str())
        .bind(match_id.as_str())
        .bind(match_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| PlayerId::new(row.get::<String, _>("player_id")))
            .collect())
    }

    /// Insert zero-valued rows into one card table. Existing rows are kept.
    ///
    /// Returns the number of rows actually inserted.
    pub async fn insert_zero_card_rows(
        &self,
        discipline: Discipline,
        match_id: &MatchId,
        team_id: Option<&TeamId>,
        player_ids: &[PlayerId],
    ) -> Result<u64, sqlx::Error> {
        if player_ids.is_empty() {
            return Ok(0);
        }

        let sql = match discipline {
            Discipline::Batting => {
                r#"
                INSERT INTO batting_cards
                (match_id, player_id, team_id, runs, balls, fours, sixes, dismissal)
                VALUES (?, ?, ?, 0, 0, 0, 0, 'did not bat')
                ON CONFLICT(match_id, player_id) DO NOTHING
                "#
            }
            Discipline::Bowling => {
                r#"
                INSERT INTO bowling_cards
                (match_id, player_id, team_id, overs, maidens, runs_conceded, wickets)
                VALUES (?, ?, ?, 0, 0, 0, 0)
                ON CONFLICT(match_id, player_id) DO NOTHING
                "#
            }
            Discipline::Fielding => {
                r#"
                INSERT INTO fielding_cards
                (match_id, player_id, team_id, catches, stumpings, runouts, drops, misfields)
                VALUES (?, ?, ?, 0, 0, 0, 0, 0)
                ON CONFLICT(match_id, player_id) DO NOTHING
                "#
            }
        };

        let mut inserted = 0u64;
        let mut tx = self.pool.begin().await?;
        for player_id in player_ids {
            let result = sqlx::query(sql)
                .bind(match_id.as_str())
                .bind(player_id.as_str())
                .bind(team_id.map(|t| t.as_str()))
                .execute(&mut *tx)
                .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;

        Ok(inserted)
    }

    async fn fetch_cards_in(
        &self,
        columns: &str,
        table: &str,
        match_ids: &[MatchId],
    ) -> Result<Vec<SqliteRow>, sqlx::Error> {
        let mut out = Vec::new();
        for chunk in match_ids.chunks(IN_CHUNK_SIZE) {
            let sql = format!(
                "SELECT {} FROM {} WHERE match_id IN ({}) ORDER BY match_id ASC, player_id ASC",
                columns,
                table,
                placeholders(chunk.len())
            );

            let mut query = sqlx::query(&sql);
            for id in chunk {
                query = query.bind(id.as_str());
            }

            out.extend(query.fetch_all(&self.pool).await?);
        }
        Ok(out)
    }
}

/// Stat column decoded leniently. `NULL`, blank or non-numeric text reads
/// as zero; numeric text is parsed.
fn stat(row: &SqliteRow, column: &str) -> f64 {
    if let Ok(value) = row.try_get::<Option<f64>, _>(column) {
        return value.unwrap_or(0.0);
    }
    row.try_get::<Option<String>, _>(column)
        .ok()
        .flatten()
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .unwrap_or(0.0)
}

fn text(row: &SqliteRow, column: &str) -> Option<String> {
    row.try_get::<Option<String>, _>(column).ok().flatten()
}

fn team_from_row(row: &SqliteRow) -> Option<TeamId> {
    text(row, "team_id").map(TeamId::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use tempfile::TempDir;

    async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    #[tokio::test]
    async fn test_batting_card_round_trip() {
        let (repo, _temp) = setup_test_db().await;
        let card = BattingCard {
            match_id: MatchId::new("m1"),
            player_id: PlayerId::new("p1"),
            team_id: Some(TeamId::new("firsts")),
            runs: 104.0,
            balls: 126.0,
            fours: 16.0,
            sixes: 0.0,
            dismissal: Dismissal::RetiredNotOut,
        };
        repo.upsert_batting_cards(&[card.clone()]).await.unwrap();

        let cards = repo.query_batting_cards(&[MatchId::new("m1")]).await.unwrap();
        assert_eq!(cards, vec![card]);
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_row_per_player() {
        let (repo, _temp) = setup_test_db().await;
        let mut card = BowlingCard::zero(MatchId::new("m1"), None, PlayerId::new("p1"));
        card.wickets = 2.0;
        repo.upsert_bowling_cards(&[card.clone()]).await.unwrap();
        card.wickets = 3.0;
        repo.upsert_bowling_cards(&[card.clone()]).await.unwrap();

        let cards = repo.query_bowling_cards(&[MatchId::new("m1")]).await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].wickets, 3.0);
    }

    #[tokio::test]
    async fn test_null_stats_read_as_zero() {
        let (repo, _temp) = setup_test_db().await;
        sqlx::query("INSERT INTO fielding_cards (match_id, player_id, catches) VALUES ('m1', 'p1', 2)")
            .execute(&repo.pool)
            .await
            .unwrap();

        let cards = repo.query_fielding_cards(&[MatchId::new("m1")]).await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].catches, 2.0);
        assert_eq!(cards[0].drops, 0.0);
        assert!(cards[0].team_id.is_none());
    }

    #[tokio::test]
    async fn test_malformed_stats_read_as_zero() {
        let (repo, _temp) = setup_test_db().await;
        sqlx::query(
            "INSERT INTO fielding_cards (match_id, player_id, catches, drops, misfields) \
             VALUES ('m1', 'p1', 2, '', 'n/a')",
        )
        .execute(&repo.pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO bowling_cards (match_id, player_id, overs, wickets) \
             VALUES ('m1', 'p1', ' 4 ', 'three')",
        )
        .execute(&repo.pool)
        .await
        .unwrap();

        let fielding = repo.query_fielding_cards(&[MatchId::new("m1")]).await.unwrap();
        assert_eq!(fielding[0].catches, 2.0);
        assert_eq!(fielding[0].drops, 0.0);
        assert_eq!(fielding[0].misfields, 0.0);

        let bowling = repo.query_bowling_cards(&[MatchId::new("m1")]).await.unwrap();
        assert_eq!(bowling[0].overs, 4.0);
        assert_eq!(bowling[0].wickets, 0.0);
    }

    #[tokio::test]
    async fn test_query_cards_empty_ids() {
        let (repo, _temp) = setup_test_db().await;
        assert!(repo.query_batting_cards(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_rows_do_not_overwrite_existing() {
        let (repo, _temp) = setup_test_db().await;
        let m = MatchId::new("m1");
        let mut card = FieldingCard::zero(m.clone(), None, PlayerId::new("p1"));
        card.catches = 3.0;
        repo.upsert_fielding_cards(&[card]).await.unwrap();

        let inserted = repo
            .insert_zero_card_rows(
                Discipline::Fielding,
                &m,
                None,
                &[PlayerId::new("p1"), PlayerId::new("p2")],
            )
            .await
            .unwrap();
        assert_eq!(inserted, 1);

        let cards = repo.query_fielding_cards(&[m.clone()]).await.unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].catches, 3.0);
        assert_eq!(cards[1].catches, 0.0);

        let players = repo.query_players_with_cards(&m).await.unwrap();
        assert_eq!(players.len(), 2);
    }
}
