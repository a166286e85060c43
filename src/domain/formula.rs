//! Versioned scoring formulas.
//!
//! A [`Formula`] is immutable once published: only its `is_active` flag ever
//! transitions. The point values live in [`FormulaRules`], which is what gets
//! serialized, fingerprinted and handed to the evaluators.

use super::primitives::{ClubId, FormulaVersionId, SeasonId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Flat bonus granted once a batter reaches `at` runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub at: f64,
    pub bonus: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BattingRules {
    pub per_run: f64,
    pub boundary_4: f64,
    pub boundary_6: f64,
    pub milestones: Vec<Milestone>,
    /// Stored non-positive; added as-is.
    pub duck_penalty: f64,
}

/// Which side of the threshold an economy band fires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandCondition {
    /// Economy <= threshold.
    AtMost,
    /// Economy >= threshold.
    AtLeast,
}

/// One economy-rate rule. `points` is signed: bonuses positive, penalties negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EconomyBand {
    pub condition: BandCondition,
    pub threshold: f64,
    pub points: f64,
}

impl EconomyBand {
    pub fn at_most(threshold: f64, points: f64) -> Self {
        Self {
            condition: BandCondition::AtMost,
            threshold,
            points,
        }
    }

    pub fn at_least(threshold: f64, points: f64) -> Self {
        Self {
            condition: BandCondition::AtLeast,
            threshold,
            points,
        }
    }

    pub fn applies(&self, economy: f64) -> bool {
        match self.condition {
            BandCondition::AtMost => economy <= self.threshold,
            BandCondition::AtLeast => economy >= self.threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BowlingRules {
    pub per_wicket: f64,
    pub maiden_over: f64,
    pub three_for_bonus: Option<f64>,
    pub five_for_bonus: Option<f64>,
    pub economy_bands: Vec<EconomyBand>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldingRules {
    pub catch: f64,
    pub stumping: f64,
    pub runout: f64,
    /// Stored non-positive; added as-is.
    pub drop_penalty: f64,
    /// Stored non-positive; added as-is.
    pub misfield_penalty: f64,
}

/// The three rule sections of a formula.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormulaRules {
    pub batting: BattingRules,
    pub bowling: BowlingRules,
    pub fielding: FieldingRules,
}

#[derive(Debug, Error, PartialEq)]
pub enum FormulaError {
    #[error("rule value {0} must be a finite number")]
    NonFinite(&'static str),
    #[error("milestone threshold must be non-negative, got {0}")]
    NegativeMilestone(f64),
}

impl FormulaRules {
    /// Reject rules that could only ever produce non-finite points.
    pub fn validate(&self) -> Result<(), FormulaError> {
        let b = &self.batting;
        let w = &self.bowling;
        let f = &self.fielding;
        let scalars: [(&'static str, f64); 13] = [
            ("batting.per_run", b.per_run),
            ("batting.boundary_4", b.boundary_4),
            ("batting.boundary_6", b.boundary_6),
            ("batting.duck_penalty", b.duck_penalty),
            ("bowling.per_wicket", w.per_wicket),
            ("bowling.maiden_over", w.maiden_over),
            ("bowling.three_for_bonus", w.three_for_bonus.unwrap_or(0.0)),
            ("bowling.five_for_bonus", w.five_for_bonus.unwrap_or(0.0)),
            ("fielding.catch", f.catch),
            ("fielding.stumping", f.stumping),
            ("fielding.runout", f.runout),
            ("fielding.drop_penalty", f.drop_penalty),
            ("fielding.misfield_penalty", f.misfield_penalty),
        ];
        for (name, value) in scalars {
            if !value.is_finite() {
                return Err(FormulaError::NonFinite(name));
            }
        }

        for milestone in &b.milestones {
            if !milestone.at.is_finite() || !milestone.bonus.is_finite() {
                return Err(FormulaError::NonFinite("batting.milestones"));
            }
            if milestone.at < 0.0 {
                return Err(FormulaError::NegativeMilestone(milestone.at));
            }
        }

        for band in &w.economy_bands {
            if !band.threshold.is_finite() || !band.points.is_finite() {
                return Err(FormulaError::NonFinite("bowling.economy_bands"));
            }
        }

        Ok(())
    }

    /// Hex SHA-256 of the canonical JSON encoding.
    ///
    /// Field order is fixed by the struct definitions, so equal rules always
    /// hash equal.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}

/// A published formula version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Formula {
    pub id: FormulaVersionId,
    pub club_id: ClubId,
    /// `None` is the club-wide default.
    pub season_id: Option<SeasonId>,
    /// Monotonic per `(club_id, season_id)`, assigned by the store.
    pub version: i64,
    pub is_active: bool,
    pub name: Option<String>,
    pub rules: FormulaRules,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_parse_with_missing_sections() {
        let rules: FormulaRules =
            serde_json::from_str(r#"{"batting":{"per_run":1,"milestones":[{"at":50,"bonus":10}]}}"#)
                .unwrap();
        assert_eq!(rules.batting.per_run, 1.0);
        assert_eq!(rules.batting.milestones.len(), 1);
        assert_eq!(rules.bowling, BowlingRules::default());
        assert_eq!(rules.fielding.catch, 0.0);
    }

    #[test]
    fn test_economy_band_serialization() {
        let band = EconomyBand::at_least(9.0, -5.0);
        let json = serde_json::to_string(&band).unwrap();
        assert_eq!(json, r#"{"condition":"at_least","threshold":9.0,"points":-5.0}"#);
    }

    #[test]
    fn test_economy_band_bounds_are_inclusive() {
        assert!(EconomyBand::at_most(3.0, 10.0).applies(3.0));
        assert!(!EconomyBand::at_most(3.0, 10.0).applies(3.01));
        assert!(EconomyBand::at_least(9.0, -5.0).applies(9.0));
        assert!(!EconomyBand::at_least(9.0, -5.0).applies(8.99));
    }

    #[test]
    fn test_fingerprint_is_stable_and_sensitive() {
        let mut rules = FormulaRules::default();
        rules.batting.per_run = 1.0;
        let same = rules.clone();
        assert_eq!(rules.fingerprint(), same.fingerprint());
        assert_eq!(rules.fingerprint().len(), 64);

        rules.batting.per_run = 2.0;
        assert_ne!(rules.fingerprint(), same.fingerprint());
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let mut rules = FormulaRules::default();
        rules.bowling.per_wicket = f64::NAN;
        assert_eq!(
            rules.validate(),
            Err(FormulaError::NonFinite("bowling.per_wicket"))
        );
    }

    #[test]
    fn test_validate_rejects_negative_milestone() {
        let mut rules = FormulaRules::default();
        rules.batting.milestones.push(Milestone {
            at: -1.0,
            bonus: 5.0,
        });
        assert_eq!(
            rules.validate(),
            Err(FormulaError::NegativeMilestone(-1.0))
        );
    }
}
