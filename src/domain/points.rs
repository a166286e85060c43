//! Derived point contributions.

use super::primitives::{FormulaVersionId, MatchId, PlayerId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Breakdown bucket of a [`PointsEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    BattingTotal,
    BowlingTotal,
    Catch,
    Stumping,
    RunOut,
    DropPenalty,
    MisfieldPenalty,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::BattingTotal => "batting_total",
            Metric::BowlingTotal => "bowling_total",
            Metric::Catch => "catch",
            Metric::Stumping => "stumping",
            Metric::RunOut => "run_out",
            Metric::DropPenalty => "drop_penalty",
            Metric::MisfieldPenalty => "misfield_penalty",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "batting_total" => Ok(Metric::BattingTotal),
            "bowling_total" => Ok(Metric::BowlingTotal),
            "catch" => Ok(Metric::Catch),
            "stumping" => Ok(Metric::Stumping),
            "run_out" => Ok(Metric::RunOut),
            "drop_penalty" => Ok(Metric::DropPenalty),
            "misfield_penalty" => Ok(Metric::MisfieldPenalty),
            other => Err(format!("unknown metric: {}", other)),
        }
    }
}

/// One auditable point contribution for a player in a match under one
/// formula version. The sum over metrics is the player's match total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsEvent {
    pub match_id: MatchId,
    pub player_id: PlayerId,
    pub formula_version_id: FormulaVersionId,
    pub metric: Metric,
    pub raw_value: f64,
    pub points: f64,
}

/// Aggregated total for one player, as read back for leaderboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerTotal {
    pub player_id: PlayerId,
    pub matches: i64,
    pub points: f64,
}
