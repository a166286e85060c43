//! In-memory store for tests and embedding without a database.

use super::{ScoringStore, StoreError};
use crate::domain::{
    BattingCard, BowlingCard, ClubId, DateRange, Discipline, FieldingCard, Formula, FormulaRules,
    FormulaVersionId, MatchId, MatchInfo, PlayerId, PlayerTotal, PointsEvent, Season, SeasonId,
    TeamId,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    formulas: Vec<Formula>,
    seasons: Vec<Season>,
    matches: Vec<MatchInfo>,
    batting: Vec<BattingCard>,
    bowling: Vec<BowlingCard>,
    fielding: Vec<FieldingCard>,
    events: Vec<PointsEvent>,
    insert_calls: usize,
    fail_insert_at_call: Option<usize>,
    fail_delete: bool,
    fail_card_reads: bool,
}

/// Store that keeps all rows in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_season(mut self, season: Season) -> Self {
        self.state.get_mut().seasons.push(season);
        self
    }

    pub fn with_match(mut self, info: MatchInfo) -> Self {
        self.state.get_mut().matches.push(info);
        self
    }

    /// Replaces any existing row for the same `(match_id, player_id)`.
    pub fn with_batting(mut self, card: BattingCard) -> Self {
        let cards = &mut self.state.get_mut().batting;
        cards.retain(|c| !(c.match_id == card.match_id && c.player_id == card.player_id));
        cards.push(card);
        self
    }

    pub fn with_bowling(mut self, card: BowlingCard) -> Self {
        let cards = &mut self.state.get_mut().bowling;
        cards.retain(|c| !(c.match_id == card.match_id && c.player_id == card.player_id));
        cards.push(card);
        self
    }

    pub fn with_fielding(mut self, card: FieldingCard) -> Self {
        let cards = &mut self.state.get_mut().fielding;
        cards.retain(|c| !(c.match_id == card.match_id && c.player_id == card.player_id));
        cards.push(card);
        self
    }

    /// Make the `n`th call to `insert_events` (1-based, counted from now) fail.
    pub async fn fail_insert_at_call(&self, n: usize) {
        let mut state = self.state.lock().await;
        state.fail_insert_at_call = Some(state.insert_calls + n);
    }

    pub async fn fail_delete(&self, fail: bool) {
        self.state.lock().await.fail_delete = fail;
    }

    pub async fn fail_card_reads(&self, fail: bool) {
        self.state.lock().await.fail_card_reads = fail;
    }

    /// Snapshot of every stored points event.
    pub async fn all_events(&self) -> Vec<PointsEvent> {
        self.state.lock().await.events.clone()
    }

    pub async fn card_counts(&self, match_id: &MatchId) -> (usize, usize, usize) {
        let state = self.state.lock().await;
        (
            state.batting.iter().filter(|c| &c.match_id == match_id).count(),
            state.bowling.iter().filter(|c| &c.match_id == match_id).count(),
            state.fielding.iter().filter(|c| &c.match_id == match_id).count(),
        )
    }
}

fn in_scope(f: &Formula, club_id: &ClubId, season_id: Option<&SeasonId>) -> bool {
    &f.club_id == club_id && f.season_id.as_ref() == season_id
}

fn in_ids(ids: &[MatchId]) -> impl Fn(&MatchId) -> bool + '_ {
    move |id| ids.contains(id)
}

#[async_trait]
impl ScoringStore for MemoryStore {
    async fn active_formula(
        &self,
        club_id: &ClubId,
        season_id: Option<&SeasonId>,
    ) -> Result<Option<Formula>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .formulas
            .iter()
            .find(|f| f.is_active && in_scope(f, club_id, season_id))
            .cloned())
    }

    async fn get_formula(&self, id: FormulaVersionId) -> Result<Option<Formula>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.formulas.iter().find(|f| f.id == id).cloned())
    }

    async fn list_formula_versions(
        &self,
        club_id: &ClubId,
        season_id: Option<&SeasonId>,
    ) -> Result<Vec<Formula>, StoreError> {
        let state = self.state.lock().await;
        let mut versions: Vec<Formula> = state
            .formulas
            .iter()
            .filter(|f| in_scope(f, club_id, season_id))
            .cloned()
            .collect();
        versions.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(versions)
    }

    async fn publish_formula(
        &self,
        club_id: &ClubId,
        season_id: Option<&SeasonId>,
        name: Option<&str>,
        rules: &FormulaRules,
    ) -> Result<Formula, StoreError> {
        let mut state = self.state.lock().await;
        let fingerprint = rules.fingerprint();

        if let Some(active) = state
            .formulas
            .iter()
            .find(|f| f.is_active && in_scope(f, club_id, season_id) && f.fingerprint == fingerprint)
        {
            return Ok(active.clone());
        }

        let version = state
            .formulas
            .iter()
            .filter(|f| in_scope(f, club_id, season_id))
            .map(|f| f.version)
            .max()
            .unwrap_or(0)
            + 1;
        let id = FormulaVersionId::new(state.formulas.len() as i64 + 1);

        for f in state.formulas.iter_mut() {
            if in_scope(f, club_id, season_id) {
                f.is_active = false;
            }
        }

        let formula = Formula {
            id,
            club_id: club_id.clone(),
            season_id: season_id.cloned(),
            version,
            is_active: true,
            name: name.map(str::to_string),
            rules: rules.clone(),
            fingerprint,
            created_at: chrono::Utc::now(),
        };
        state.formulas.push(formula.clone());
        Ok(formula)
    }

    async fn activate_formula(&self, id: FormulaVersionId) -> Result<Option<Formula>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(target) = state.formulas.iter().find(|f| f.id == id).cloned() else {
            return Ok(None);
        };
        for f in state.formulas.iter_mut() {
            if f.club_id == target.club_id && f.season_id == target.season_id {
                f.is_active = f.id == id;
            }
        }
        Ok(state.formulas.iter().find(|f| f.id == id).cloned())
    }

    async fn get_season(&self, season_id: &SeasonId) -> Result<Option<Season>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.seasons.iter().find(|s| &s.id == season_id).cloned())
    }

    async fn list_seasons(&self, club_id: &ClubId) -> Result<Vec<Season>, StoreError> {
        let state = self.state.lock().await;
        let mut seasons: Vec<Season> = state
            .seasons
            .iter()
            .filter(|s| &s.club_id == club_id)
            .cloned()
            .collect();
        seasons.sort_by(|a, b| a.start_date.cmp(&b.start_date).then_with(|| a.id.cmp(&b.id)));
        Ok(seasons)
    }

    async fn get_match(&self, match_id: &MatchId) -> Result<Option<MatchInfo>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.matches.iter().find(|m| &m.id == match_id).cloned())
    }

    async fn list_matches(
        &self,
        club_id: &ClubId,
        range: DateRange,
    ) -> Result<Vec<MatchInfo>, StoreError> {
        let state = self.state.lock().await;
        let mut matches: Vec<MatchInfo> = state
            .matches
            .iter()
            .filter(|m| &m.club_id == club_id && range.contains(m.match_date))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.match_date.cmp(&b.match_date).then_with(|| a.id.cmp(&b.id)));
        Ok(matches)
    }

    async fn list_batting_cards(
        &self,
        match_ids: &[MatchId],
    ) -> Result<Vec<BattingCard>, StoreError> {
        let state = self.state.lock().await;
        if state.fail_card_reads {
            return Err(StoreError::Read("batting cards unavailable".to_string()));
        }
        let wanted = in_ids(match_ids);
        Ok(state.batting.iter().filter(|c| wanted(&c.match_id)).cloned().collect())
    }

    async fn list_bowling_cards(
        &self,
        match_ids: &[MatchId],
    ) -> Result<Vec<BowlingCard>, StoreError> {
        let state = self.state.lock().await;
        if state.fail_card_reads {
            return Err(StoreError::Read("bowling cards unavailable".to_string()));
        }
        let wanted = in_ids(match_ids);
        Ok(state.bowling.iter().filter(|c| wanted(&c.match_id)).cloned().collect())
    }

    async fn list_fielding_cards(
        &self,
        match_ids: &[MatchId],
    ) -> Result<Vec<FieldingCard>, StoreError> {
        let state = self.state.lock().await;
        if state.fail_card_reads {
            return Err(StoreError::Read("fielding cards unavailable".to_string()));
        }
        let wanted = in_ids(match_ids);
        Ok(state.fielding.iter().filter(|c| wanted(&c.match_id)).cloned().collect())
    }

    async fn players_with_cards(&self, match_id: &MatchId) -> Result<HashSet<PlayerId>, StoreError> {
        let state = self.state.lock().await;
        if state.fail_card_reads {
            return Err(StoreError::Read("cards unavailable".to_string()));
        }
        let keys = state
            .batting
            .iter()
            .map(|c| (&c.match_id, &c.player_id))
            .chain(state.bowling.iter().map(|c| (&c.match_id, &c.player_id)))
            .chain(state.fielding.iter().map(|c| (&c.match_id, &c.player_id)));
        Ok(keys
            .filter(|(m, _)| *m == match_id)
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn insert_zero_cards(
        &self,
        discipline: Discipline,
        match_id: &MatchId,
        team_id: Option<&TeamId>,
        player_ids: &[PlayerId],
    ) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let mut inserted = 0u64;
        for player_id in player_ids {
            let same = |m: &MatchId, p: &PlayerId| m == match_id && p == player_id;
            let exists = match discipline {
                Discipline::Batting => state.batting.iter().any(|c| same(&c.match_id, &c.player_id)),
                Discipline::Bowling => state.bowling.iter().any(|c| same(&c.match_id, &c.player_id)),
                Discipline::Fielding => {
                    state.fielding.iter().any(|c| same(&c.match_id, &c.player_id))
                }
            };
            if exists {
                continue;
            }
            let (m, t, p) = (match_id.clone(), team_id.cloned(), player_id.clone());
            match discipline {
                Discipline::Batting => state.batting.push(BattingCard::zero(m, t, p)),
                Discipline::Bowling => state.bowling.push(BowlingCard::zero(m, t, p)),
                Discipline::Fielding => state.fielding.push(FieldingCard::zero(m, t, p)),
            }
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn delete_events(
        &self,
        match_ids: &[MatchId],
        formula_version_id: FormulaVersionId,
    ) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        if state.fail_delete {
            return Err(StoreError::Write("delete rejected".to_string()));
        }
        let before = state.events.len();
        state.events.retain(|e| {
            !(e.formula_version_id == formula_version_id && match_ids.contains(&e.match_id))
        });
        Ok((before - state.events.len()) as u64)
    }

    async fn insert_events(&self, rows: &[PointsEvent]) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        state.insert_calls += 1;
        if state.fail_insert_at_call == Some(state.insert_calls) {
            return Err(StoreError::Write("insert rejected".to_string()));
        }
        state.events.extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn list_events(
        &self,
        match_id: &MatchId,
        formula_version_id: FormulaVersionId,
    ) -> Result<Vec<PointsEvent>, StoreError> {
        let state = self.state.lock().await;
        let mut events: Vec<PointsEvent> = state
            .events
            .iter()
            .filter(|e| &e.match_id == match_id && e.formula_version_id == formula_version_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.player_id.cmp(&b.player_id).then_with(|| a.metric.cmp(&b.metric)));
        Ok(events)
    }

    async fn player_totals(
        &self,
        club_id: &ClubId,
        formula_version_id: FormulaVersionId,
        range: DateRange,
    ) -> Result<Vec<PlayerTotal>, StoreError> {
        let state = self.state.lock().await;
        let match_ids: HashSet<&MatchId> = state
            .matches
            .iter()
            .filter(|m| &m.club_id == club_id && range.contains(m.match_date))
            .map(|m| &m.id)
            .collect();

        let mut appearances: BTreeMap<&PlayerId, HashSet<&MatchId>> = BTreeMap::new();
        let keys = state
            .batting
            .iter()
            .map(|c| (&c.match_id, &c.player_id))
            .chain(state.bowling.iter().map(|c| (&c.match_id, &c.player_id)))
            .chain(state.fielding.iter().map(|c| (&c.match_id, &c.player_id)));
        for (match_id, player_id) in keys {
            if match_ids.contains(match_id) {
                appearances.entry(player_id).or_default().insert(match_id);
            }
        }

        let mut points: HashMap<&PlayerId, f64> = HashMap::new();
        for event in &state.events {
            if event.formula_version_id == formula_version_id && match_ids.contains(&event.match_id) {
                *points.entry(&event.player_id).or_default() += event.points;
            }
        }

        let mut totals: Vec<PlayerTotal> = appearances
            .into_iter()
            .map(|(player_id, matches)| PlayerTotal {
                player_id: player_id.clone(),
                matches: matches.len() as i64,
                points: points.get(player_id).copied().unwrap_or(0.0),
            })
            .collect();
        totals.sort_by(|a, b| {
            b.points
                .total_cmp(&a.points)
                .then_with(|| a.player_id.cmp(&b.player_id))
        });
        Ok(totals)
    }
}
