use crate::domain::{BattingCard, BattingRules};

use super::numeric::{accumulate, finite_or_zero, scaled};

/// Batting points for one innings.
///
/// Every milestone the batter reached contributes its bonus, so a century
/// also collects the fifty bonus. The duck penalty only applies to a batter
/// who faced at least one ball and was actually dismissed.
pub fn calc_batting_points(rules: &BattingRules, card: &BattingCard) -> f64 {
    let runs = finite_or_zero(card.runs);
    let balls = finite_or_zero(card.balls);

    let mut total = scaled(runs, rules.per_run);
    total = accumulate(total, scaled(card.fours, rules.boundary_4));
    total = accumulate(total, scaled(card.sixes, rules.boundary_6));

    for milestone in &rules.milestones {
        if runs >= milestone.at {
            total = accumulate(total, milestone.bonus);
        }
    }

    if runs == 0.0 && balls > 0.0 && card.dismissal.is_out() {
        total = accumulate(total, rules.duck_penalty);
    }

    total
}
