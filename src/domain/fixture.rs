//! Seasons and matches: the scope a recompute runs over.

use super::primitives::{ClubId, DateRange, MatchId, SeasonId, TeamId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Season {
    pub id: SeasonId,
    pub club_id: ClubId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Season {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchInfo {
    pub id: MatchId,
    pub club_id: ClubId,
    pub season_id: Option<SeasonId>,
    pub team_id: Option<TeamId>,
    pub match_date: NaiveDate,
    pub opponent: Option<String>,
}
