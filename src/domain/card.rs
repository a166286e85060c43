//! Raw per-player, per-match, per-discipline statistic rows.

use super::primitives::{MatchId, PlayerId, TeamId};
use serde::{Deserialize, Serialize};

/// The three card tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Discipline {
    Batting,
    Bowling,
    Fielding,
}

impl Discipline {
    pub const ALL: [Discipline; 3] = [Discipline::Batting, Discipline::Bowling, Discipline::Fielding];
}

impl std::fmt::Display for Discipline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Discipline::Batting => write!(f, "batting"),
            Discipline::Bowling => write!(f, "bowling"),
            Discipline::Fielding => write!(f, "fielding"),
        }
    }
}

/// How a batting innings ended.
///
/// Parsed from scorecard free text. Only the variants that end the innings
/// through the opposition count as a real out for duck purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Dismissal {
    DidNotBat,
    NotOut,
    RetiredNotOut,
    RetiredHurt,
    Bowled,
    Caught,
    Lbw,
    RunOut,
    Stumped,
    HitWicket,
    RetiredOut,
    /// Any other recorded mode of dismissal; treated as out.
    Other(String),
}

impl Dismissal {
    pub fn is_out(&self) -> bool {
        !matches!(
            self,
            Dismissal::DidNotBat
                | Dismissal::NotOut
                | Dismissal::RetiredNotOut
                | Dismissal::RetiredHurt
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            Dismissal::DidNotBat => "did not bat",
            Dismissal::NotOut => "not out",
            Dismissal::RetiredNotOut => "retired not out",
            Dismissal::RetiredHurt => "retired hurt",
            Dismissal::Bowled => "bowled",
            Dismissal::Caught => "caught",
            Dismissal::Lbw => "lbw",
            Dismissal::RunOut => "run out",
            Dismissal::Stumped => "stumped",
            Dismissal::HitWicket => "hit wicket",
            Dismissal::RetiredOut => "retired out",
            Dismissal::Other(s) => s,
        }
    }
}

impl Default for Dismissal {
    fn default() -> Self {
        Dismissal::DidNotBat
    }
}

impl From<&str> for Dismissal {
    fn from(raw: &str) -> Self {
        let normalized = raw
            .trim()
            .to_ascii_lowercase()
            .replace(['-', '_'], " ");
        match normalized.as_str() {
            "" | "dnb" | "did not bat" => Dismissal::DidNotBat,
            "not out" | "no" => Dismissal::NotOut,
            "retired not out" | "retired" | "rno" => Dismissal::RetiredNotOut,
            "retired hurt" | "rh" => Dismissal::RetiredHurt,
            "bowled" | "b" => Dismissal::Bowled,
            "caught" | "c" | "caught and bowled" | "c&b" => Dismissal::Caught,
            "lbw" => Dismissal::Lbw,
            "run out" | "ro" => Dismissal::RunOut,
            "stumped" | "st" => Dismissal::Stumped,
            "hit wicket" | "hw" => Dismissal::HitWicket,
            "retired out" => Dismissal::RetiredOut,
            _ => Dismissal::Other(normalized),
        }
    }
}

impl From<String> for Dismissal {
    fn from(raw: String) -> Self {
        Dismissal::from(raw.as_str())
    }
}

impl From<Dismissal> for String {
    fn from(d: Dismissal) -> Self {
        d.as_str().to_string()
    }
}

impl std::fmt::Display for Dismissal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattingCard {
    pub match_id: MatchId,
    pub player_id: PlayerId,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    #[serde(default)]
    pub runs: f64,
    #[serde(default)]
    pub balls: f64,
    #[serde(default)]
    pub fours: f64,
    #[serde(default)]
    pub sixes: f64,
    #[serde(default)]
    pub dismissal: Dismissal,
}

impl BattingCard {
    /// Explicit "did not bat" row.
    pub fn zero(match_id: MatchId, team_id: Option<TeamId>, player_id: PlayerId) -> Self {
        Self {
            match_id,
            player_id,
            team_id,
            runs: 0.0,
            balls: 0.0,
            fours: 0.0,
            sixes: 0.0,
            dismissal: Dismissal::DidNotBat,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BowlingCard {
    pub match_id: MatchId,
    pub player_id: PlayerId,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    /// Overs-as-decimal notation: `8.4` is eight overs and four balls.
    #[serde(default)]
    pub overs: f64,
    #[serde(default)]
    pub maidens: f64,
    #[serde(default)]
    pub runs_conceded: f64,
    #[serde(default)]
    pub wickets: f64,
}

impl BowlingCard {
    pub fn zero(match_id: MatchId, team_id: Option<TeamId>, player_id: PlayerId) -> Self {
        Self {
            match_id,
            player_id,
            team_id,
            overs: 0.0,
            maidens: 0.0,
            runs_conceded: 0.0,
            wickets: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldingCard {
    pub match_id: MatchId,
    pub player_id: PlayerId,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    #[serde(default)]
    pub catches: f64,
    #[serde(default)]
    pub stumpings: f64,
    #[serde(default)]
    pub runouts: f64,
    #[serde(default)]
    pub drops: f64,
    #[serde(default)]
    pub misfields: f64,
}

impl FieldingCard {
    pub fn zero(match_id: MatchId, team_id: Option<TeamId>, player_id: PlayerId) -> Self {
        Self {
            match_id,
            player_id,
            team_id,
            catches: 0.0,
            stumpings: 0.0,
            runouts: 0.0,
            drops: 0.0,
            misfields: 0.0,
        }
    }
}
