//! Formula publishing, activation and lookup.
//!
//! Formula rows are append-only. Publishing deactivates the previous version
//! of the same `(club_id, season_id)` scope and inserts the next version in
//! one transaction; nothing but `is_active` ever changes on an existing row.

use crate::domain::{ClubId, Formula, FormulaRules, FormulaVersionId, SeasonId};
use chrono::TimeZone;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::info;

use super::Repository;

const FORMULA_COLUMNS: &str =
    "id, club_id, season_id, version, is_active, name, rules_json, fingerprint, created_at";

/// `season_id` column is nullable and NULLs never collide in UNIQUE
/// constraints, so uniqueness is enforced on this derived key instead.
fn scope_key(season_id: Option<&SeasonId>) -> &str {
    season_id.map(|s| s.as_str()).unwrap_or("")
}

impl Repository {
    /// Publish a new formula version for a scope.
    ///
    /// The version number is `MAX(version) + 1` for the scope, computed inside
    /// the same transaction that inserts the row; the `(club_id, scope_key,
    /// version)` unique key rejects a concurrent duplicate. Publishing rules
    /// whose fingerprint matches the active version returns that version.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn insert_formula_version(
        &self,
        club_id: &ClubId,
        season_id: Option<&SeasonId>,
        name: Option<&str>,
        rules: &FormulaRules,
    ) -> Result<Formula, sqlx::Error> {
        let fingerprint = rules.fingerprint();
        let rules_json = serde_json::to_string(rules)
            .map_err(|e| sqlx::Error::Protocol(format!("failed to encode formula rules: {}", e)))?;
        let scope = scope_key(season_id);

        let mut tx = self.pool.begin().await?;

        let active = sqlx::query(&format!(
            "SELECT {} FROM formulas WHERE club_id = ? AND scope_key = ? AND is_active = 1",
            FORMULA_COLUMNS
        ))
        .bind(club_id.as_str())
        .bind(scope)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(row) = active {
            let current = formula_from_row(&row)?;
            if current.fingerprint == fingerprint {
                tx.commit().await?;
                info!(
                    club_id = %club_id,
                    formula_id = %current.id,
                    version = current.version,
                    "Formula unchanged, keeping active version"
                );
                return Ok(current);
            }
        }

        let next_version: i64 = sqlx::query(
            r#"
            SELECT COALESCE(MAX(version), 0) + 1 AS next_version
            FROM formulas
            WHERE club_id = ? AND scope_key = ?
            "#,
        )
        .bind(club_id.as_str())
        .bind(scope)
        .fetch_one(&mut *tx)
        .await?
        .get("next_version");

        sqlx::query(
            "UPDATE formulas SET is_active = 0 WHERE club_id = ? AND scope_key = ? AND is_active = 1",
        )
        .bind(club_id.as_str())
        .bind(scope)
        .execute(&mut *tx)
        .await?;

        let created_at = chrono::Utc::now().timestamp_millis();
        let result = sqlx::query(
            r#"
            INSERT INTO formulas (
                club_id, season_id, scope_key, version, is_active, name,
                rules_json, fingerprint, created_at
            ) VALUES (?, ?, ?, ?, 1, ?, ?, ?, ?)
            "#,
        )
        .bind(club_id.as_str())
        .bind(season_id.map(|s| s.as_str()))
        .bind(scope)
        .bind(next_version)
        .bind(name)
        .bind(&rules_json)
        .bind(&fingerprint)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        let id = FormulaVersionId::new(result.last_insert_rowid());
        tx.commit().await?;

        info!(
            club_id = %club_id,
            season_id = scope,
            formula_id = %id,
            version = next_version,
            "Published formula version"
        );

        self.query_formula(id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Make `id` the only active version of its scope.
    ///
    /// Returns `None` if no such version exists.
    pub async fn set_active_formula(
        &self,
        id: FormulaVersionId,
    ) -> Result<Option<Formula>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let scope = sqlx::query("SELECT club_id, scope_key FROM formulas WHERE id = ?")
            .bind(id.as_i64())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(scope) = scope else {
            return Ok(None);
        };
        let club_id: String = scope.get("club_id");
        let scope_key: String = scope.get("scope_key");

        sqlx::query(
            "UPDATE formulas SET is_active = 0 WHERE club_id = ? AND scope_key = ? AND is_active = 1",
        )
        .bind(&club_id)
        .bind(&scope_key)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE formulas SET is_active = 1 WHERE id = ?")
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(club_id = %club_id, formula_id = %id, "Activated formula version");

        self.query_formula(id).await
    }

    pub async fn query_formula(&self, id: FormulaVersionId) -> Result<Option<Formula>, sqlx::Error> {
        let row = sqlx::query(&format!("SELECT {} FROM formulas WHERE id = ?", FORMULA_COLUMNS))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(formula_from_row).transpose()
    }

    /// Active formula scoped exactly to `(club_id, season_id)`.
    pub async fn query_active_formula(
        &self,
        club_id: &ClubId,
        season_id: Option<&SeasonId>,
    ) -> Result<Option<Formula>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM formulas WHERE club_id = ? AND scope_key = ? AND is_active = 1",
            FORMULA_COLUMNS
        ))
        .bind(club_id.as_str())
        .bind(scope_key(season_id))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(formula_from_row).transpose()
    }

    /// Every version of a scope, newest first.
    pub async fn query_formula_versions(
        &self,
        club_id: &ClubId,
        season_id: Option<&SeasonId>,
    ) -> Result<Vec<Formula>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM formulas WHERE club_id = ? AND scope_key = ? ORDER BY version DESC",
            FORMULA_COLUMNS
        ))
        .bind(club_id.as_str())
        .bind(scope_key(season_id))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(formula_from_row).collect()
    }
}

fn formula_from_row(row: &SqliteRow) -> Result<Formula, sqlx::Error> {
    let rules_json: String = row.get("rules_json");
    let rules: FormulaRules =
        serde_json::from_str(&rules_json).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    let created_ms: i64 = row.get("created_at");

    Ok(Formula {
        id: FormulaVersionId::new(row.get("id")),
        club_id: ClubId::new(row.get::<String, _>("club_id")),
        season_id: row.get::<Option<String>, _>("season_id").map(SeasonId::new),
        version: row.get("version"),
        is_active: row.get::<i64, _>("is_active") != 0,
        name: row.get("name"),
        rules,
        fingerprint: row.get("fingerprint"),
        created_at: chrono::Utc
            .timestamp_millis_opt(created_ms)
            .single()
            .unwrap_or_default(),
    })
}
