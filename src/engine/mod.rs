//! Rule evaluators: pure functions from one card and one rule section to points.
//!
//! This module provides:
//! - `calc_batting_points`, `calc_bowling_points`, `calc_fielding_points`
//! - `ScoreSheet`, which runs the evaluators over many cards and collects
//!   the resulting sparse `PointsEvent` rows

pub mod batting;
pub mod bowling;
pub mod fielding;
pub mod numeric;

pub use batting::calc_batting_points;
pub use bowling::{calc_bowling_points, economy};
pub use fielding::{calc_fielding_points, fielding_breakdown, FieldingComponent};

use crate::domain::{
    BattingCard, BowlingCard, FieldingCard, Formula, FormulaRules, FormulaVersionId, MatchId,
    Metric, PlayerId, PointsEvent,
};
use numeric::{any_non_finite, finite_or_zero};
use tracing::warn;

/// Accumulates points events for one formula version.
///
/// Events with exactly zero points are not emitted.
pub struct ScoreSheet<'a> {
    rules: &'a FormulaRules,
    formula_version_id: FormulaVersionId,
    events: Vec<PointsEvent>,
    anomalies: usize,
}

impl<'a> ScoreSheet<'a> {
    pub fn new(formula: &'a Formula) -> Self {
        Self::with_rules(&formula.rules, formula.id)
    }

    pub fn with_rules(rules: &'a FormulaRules, formula_version_id: FormulaVersionId) -> Self {
        Self {
            rules,
            formula_version_id,
            events: Vec::new(),
            anomalies: 0,
        }
    }

    pub fn add_batting(&mut self, card: &BattingCard) {
        if any_non_finite(&[card.runs, card.balls, card.fours, card.sixes]) {
            self.note_anomaly("batting", card.match_id.as_str(), card.player_id.as_str());
        }
        let points = calc_batting_points(&self.rules.batting, card);
        self.push(card, Metric::BattingTotal, finite_or_zero(card.runs), points);
    }

    pub fn add_bowling(&mut self, card: &BowlingCard) {
        if any_non_finite(&[card.overs, card.maidens, card.runs_conceded, card.wickets]) {
            self.note_anomaly("bowling", card.match_id.as_str(), card.player_id.as_str());
        }
        let points = calc_bowling_points(&self.rules.bowling, card);
        self.push(card, Metric::BowlingTotal, finite_or_zero(card.wickets), points);
    }

    pub fn add_fielding(&mut self, card: &FieldingCard) {
        if any_non_finite(&[
            card.catches,
            card.stumpings,
            card.runouts,
            card.drops,
            card.misfields,
        ]) {
            self.note_anomaly("fielding", card.match_id.as_str(), card.player_id.as_str());
        }
        for component in fielding_breakdown(&self.rules.fielding, card) {
            self.push(card, component.metric, component.raw_value, component.points);
        }
    }

    /// Number of cards that carried non-finite stats.
    pub fn anomalies(&self) -> usize {
        self.anomalies
    }

    pub fn events(&self) -> &[PointsEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<PointsEvent> {
        self.events
    }

    fn push(&mut self, card: &impl CardKey, metric: Metric, raw_value: f64, points: f64) {
        if points == 0.0 {
            return;
        }
        let (match_id, player_id) = card.key();
        self.events.push(PointsEvent {
            match_id: match_id.clone(),
            player_id: player_id.clone(),
            formula_version_id: self.formula_version_id,
            metric,
            raw_value,
            points,
        });
    }

    fn note_anomaly(&mut self, discipline: &str, match_id: &str, player_id: &str) {
        self.anomalies += 1;
        warn!(
            discipline,
            match_id, player_id, "Non-finite stat on card, clamping to zero"
        );
    }
}

trait CardKey {
    fn key(&self) -> (&MatchId, &PlayerId);
}

impl CardKey for BattingCard {
    fn key(&self) -> (&MatchId, &PlayerId) {
        (&self.match_id, &self.player_id)
    }
}

impl CardKey for BowlingCard {
    fn key(&self) -> (&MatchId, &PlayerId) {
        (&self.match_id, &self.player_id)
    }
}

impl CardKey for FieldingCard {
    fn key(&self) -> (&MatchId, &PlayerId) {
        (&self.match_id, &self.player_id)
    }
}
