//! Points event replace and aggregation.

use crate::domain::{
    ClubId, DateRange, FormulaVersionId, MatchId, Metric, PlayerId, PlayerTotal, PointsEvent,
};
use sqlx::Row;
use std::str::FromStr;

use super::{placeholders, Repository, IN_CHUNK_SIZE};

impl Repository {
    /// Delete every event of the given matches under one formula version.
    ///
    /// All chunks run inside one transaction so a failure leaves the old
    /// rows in place.
    pub async fn delete_points_events(
        &self,
        match_ids: &[MatchId],
        formula_version_id: FormulaVersionId,
    ) -> Result<u64, sqlx::Error> {
        if match_ids.is_empty() {
            return Ok(0);
        }

        let mut deleted = 0u64;
        let mut tx = self.pool.begin().await?;

        for chunk in match_ids.chunks(IN_CHUNK_SIZE) {
            let sql = format!(
                "DELETE FROM points_events WHERE formula_version_id = ? AND match_id IN ({})",
                placeholders(chunk.len())
            );

            let mut query = sqlx::query(&sql).bind(formula_version_id.as_i64());
            for id in chunk {
                query = query.bind(id.as_str());
            }

            deleted += query.execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(deleted)
    }

    /// Insert a batch of events in a single transaction.
    ///
    /// # Errors
    /// Returns an error if the transaction fails; nothing from the batch is
    /// kept in that case.
    pub async fn insert_points_events_batch(
        &self,
        events: &[PointsEvent],
    ) -> Result<u64, sqlx::Error> {
        if events.is_empty() {
            return Ok(0);
        }

        let created_at = chrono::Utc::now().timestamp_millis();
        let mut inserted = 0u64;
        let mut tx = self.pool.begin().await?;

        for event in events {
            let result = sqlx::query(
                r#"
                INSERT INTO points_events (
                    match_id, player_id, formula_version_id, metric,
                    raw_value, points, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(event.match_id.as_str())
            .bind(event.player_id.as_str())
            .bind(event.formula_version_id.as_i64())
            .bind(event.metric.as_str())
            .bind(event.raw_value)
            .bind(event.points)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn query_points_events(
        &self,
        match_id: &MatchId,
        formula_version_id: FormulaVersionId,
    ) -> Result<Vec<PointsEvent>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT match_id, player_id, formula_version_id, metric, raw_value, points
            FROM points_events
            WHERE match_id = ? AND formula_version_id = ?
            ORDER BY player_id ASC, metric ASC, id ASC
            "#,
        )
        .bind(match_id.as_str())
        .bind(formula_version_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let metric: String = row.get("metric");
                Ok(PointsEvent {
                    match_id: MatchId::new(row.get::<String, _>("match_id")),
                    player_id: PlayerId::new(row.get::<String, _>("player_id")),
                    formula_version_id: FormulaVersionId::new(row.get("formula_version_id")),
                    metric: Metric::from_str(&metric)
                        .map_err(|e| sqlx::Error::Decode(e.into()))?,
                    raw_value: row.get("raw_value"),
                    points: row.get("points"),
                })
            })
            .collect()
    }

    /// Per-player totals over a club's matches in `range`.
    ///
    /// Players come from the card tables, so anyone who appeared is listed
    /// even without events; their total is zero.
    pub async fn query_player_totals(
        &self,
        club_id: &ClubId,
        formula_version_id: FormulaVersionId,
        range: DateRange,
    ) -> Result<Vec<PlayerTotal>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            WITH scope AS (
                SELECT id FROM matches
                WHERE club_id = ? AND match_date >= ? AND match_date <= ?
            ),
            appearances AS (
                SELECT match_id, player_id FROM batting_cards
                WHERE match_id IN (SELECT id FROM scope)
                UNION
                SELECT match_id, player_id FROM bowling_cards
                WHERE match_id IN (SELECT id FROM scope)
                UNION
                SELECT match_id, player_id FROM fielding_cards
                WHERE match_id IN (SELECT id FROM scope)
            ),
            players AS (
                SELECT player_id, COUNT(*) AS matches
                FROM appearances
                GROUP BY player_id
            ),
            totals AS (
                SELECT player_id, SUM(points) AS points
                FROM points_events
                WHERE formula_version_id = ? AND match_id IN (SELECT id FROM scope)
                GROUP BY player_id
            )
            SELECT p.player_id AS player_id,
                   p.matches AS matches,
                   COALESCE(t.points, 0.0) AS points
            FROM players p
            LEFT JOIN totals t ON t.player_id = p.player_id
            ORDER BY points DESC, p.player_id ASC
            "#,
        )
        .bind(club_id.as_str())
        .bind(range.start.to_string())
        .bind(range.end.to_string())
        .bind(formula_version_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| PlayerTotal {
                player_id: PlayerId::new(row.get::<String, _>("player_id")),
                matches: row.get("matches"),
                points: row.get("points"),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use crate::domain::{FieldingCard, FormulaRules, MatchInfo};
    use chrono::NaiveDate;
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

    async fn publish(repo: &Repository) -> FormulaVersionId {
        repo.insert_formula_version(&ClubId::new("club-1"), None, None, &FormulaRules::default())
            .await
            .unwrap()
            .id
    }

    fn event(match_id: &str, player_id: &str, v: FormulaVersionId, metric: Metric, points: f64) -> PointsEvent {
        PointsEvent {
            match_id: MatchId::new(match_id),
            player_id: PlayerId::new(player_id),
            formula_version_id: v,
            metric,
            raw_value: points,
            points,
        }
    }

    #[tokio::test]
    async fn test_insert_and_query_events() {
        let (repo, _temp) = setup_test_db().await;
        let v = publish(&repo).await;

        let inserted = repo
            .insert_points_events_batch(&[
                event("m1", "p2", v, Metric::Catch, 10.0),
                event("m1", "p1", v, Metric::BattingTotal, 155.0),
                event("m2", "p1", v, Metric::BattingTotal, 4.0),
            ])
            .await
            .unwrap();
        assert_eq!(inserted, 3);

        let events = repo.query_points_events(&MatchId::new("m1"), v).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].player_id.as_str(), "p1");
        assert_eq!(events[0].points, 155.0);
        assert_eq!(events[1].metric, Metric::Catch);
    }

    #[tokio::test]
    async fn test_delete_scoped_to_matches_and_version() {
        let (repo, _temp) = setup_test_db().await;
        let v1 = publish(&repo).await;
        let mut rules = FormulaRules::default();
        rules.batting.per_run = 2.0;
        let v2 = repo
            .insert_formula_version(&ClubId::new("club-1"), None, None, &rules)
            .await
            .unwrap()
            .id;

        repo.insert_points_events_batch(&[
            event("m1", "p1", v1, Metric::BattingTotal, 1.0),
            event("m1", "p1", v2, Metric::BattingTotal, 2.0),
            event("m2", "p1", v1, Metric::BattingTotal, 3.0),
        ])
        .await
        .unwrap();

        let deleted = repo
            .delete_points_events(&[MatchId::new("m1")], v1)
            .await
            .unwrap();
        assert_eq!(deleted, 1);

        assert!(repo.query_points_events(&MatchId::new("m1"), v1).await.unwrap().is_empty());
        assert_eq!(repo.query_points_events(&MatchId::new("m1"), v2).await.unwrap().len(), 1);
        assert_eq!(repo.query_points_events(&MatchId::new("m2"), v1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_many_matches_crosses_chunks() {
        let (repo, _temp) = setup_test_db().await;
        let v = publish(&repo).await;

        let ids: Vec<MatchId> = (0..1200).map(|i| MatchId::new(format!("m{}", i))).collect();
        let events: Vec<PointsEvent> = ids
            .iter()
            .map(|m| event(m.as_str(), "p1", v, Metric::Catch, 1.0))
            .collect();
        repo.insert_points_events_batch(&events).await.unwrap();

        assert_eq!(repo.delete_points_events(&ids, v).await.unwrap(), 1200);
    }

    #[tokio::test]
    async fn test_player_totals_include_zero_rows() {
        let (repo, _temp) = setup_test_db().await;
        let v = publish(&repo).await;
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        repo.upsert_match(&MatchInfo {
            id: MatchId::new("m1"),
            club_id: ClubId::new("club-1"),
            season_id: None,
            team_id: None,
            match_date: date,
            opponent: None,
        })
        .await
        .unwrap();
        repo.upsert_fielding_cards(&[
            FieldingCard::zero(MatchId::new("m1"), None, PlayerId::new("p1")),
            FieldingCard::zero(MatchId::new("m1"), None, PlayerId::new("p2")),
        ])
        .await
        .unwrap();
        repo.insert_points_events_batch(&[
            event("m1", "p2", v, Metric::Catch, 10.0),
            event("m1", "p2", v, Metric::DropPenalty, -2.0),
        ])
        .await
        .unwrap();

        let totals = repo
            .query_player_totals(&ClubId::new("club-1"), v, DateRange::new(date, date))
            .await
            .unwrap();

        assert_eq!(
            totals,
            vec![
                PlayerTotal {
                    player_id: PlayerId::new("p2"),
                    matches: 1,
                    points: 8.0,
                },
                PlayerTotal {
                    player_id: PlayerId::new("p1"),
                    matches: 1,
                    points: 0.0,
                },
            ]
        );
    }
}
