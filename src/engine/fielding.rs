use crate::domain::{FieldingCard, FieldingRules, Metric};

use super::numeric::{accumulate, finite_or_zero, scaled};

/// One fielding contribution: the metric bucket, the raw count and the points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldingComponent {
    pub metric: Metric,
    pub raw_value: f64,
    pub points: f64,
}

/// Per-metric fielding contributions. Penalty rules are expected to be
/// non-positive and are added without negation.
pub fn fielding_breakdown(rules: &FieldingRules, card: &FieldingCard) -> [FieldingComponent; 5] {
    let component = |metric, count: f64, per_unit| FieldingComponent {
        metric,
        raw_value: finite_or_zero(count),
        points: scaled(count, per_unit),
    };
    [
        component(Metric::Catch, card.catches, rules.catch),
        component(Metric::Stumping, card.stumpings, rules.stumping),
        component(Metric::RunOut, card.runouts, rules.runout),
        component(Metric::DropPenalty, card.drops, rules.drop_penalty),
        component(Metric::MisfieldPenalty, card.misfields, rules.misfield_penalty),
    ]
}

pub fn calc_fielding_points(rules: &FieldingRules, card: &FieldingCard) -> f64 {
    fielding_breakdown(rules, card)
        .iter()
        .fold(0.0, |total, c| accumulate(total, c.points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MatchId, PlayerId};

    fn rules() -> FieldingRules {
        FieldingRules {
            catch: 8.0,
            stumping: 12.0,
            runout: 10.0,
            drop_penalty: -5.0,
            misfield_penalty: -2.0,
        }
    }

    fn card() -> FieldingCard {
        FieldingCard {
            catches: 2.0,
            stumpings: 1.0,
            runouts: 1.0,
            drops: 1.0,
            misfields: 3.0,
            ..FieldingCard::zero(MatchId::new("m1"), None, PlayerId::new("p1"))
        }
    }

    #[test]
    fn test_fielding_total() {
        // 16 + 12 + 10 - 5 - 6
        assert_eq!(calc_fielding_points(&rules(), &card()), 27.0);
    }

    #[test]
    fn test_breakdown_sums_to_total() {
        let breakdown = fielding_breakdown(&rules(), &card());
        let sum: f64 = breakdown.iter().map(|c| c.points).sum();
        assert_eq!(sum, calc_fielding_points(&rules(), &card()));
        assert_eq!(breakdown[3].metric, Metric::DropPenalty);
        assert_eq!(breakdown[3].raw_value, 1.0);
        assert_eq!(breakdown[3].points, -5.0);
    }

    #[test]
    fn test_penalties_are_not_negated() {
        let mut r = rules();
        r.drop_penalty = 5.0;
        let c = FieldingCard {
            drops: 1.0,
            ..FieldingCard::zero(MatchId::new("m1"), None, PlayerId::new("p1"))
        };
        assert_eq!(calc_fielding_points(&r, &c), 5.0);
    }

    #[test]
    fn test_overflowing_component_is_dropped() {
        let r = FieldingRules {
            catch: f64::MAX,
            stumping: f64::MAX,
            ..rules()
        };
        let c = FieldingCard {
            catches: 1.0,
            stumpings: 1.0,
            drops: 1.0,
            ..FieldingCard::zero(MatchId::new("m1"), None, PlayerId::new("p1"))
        };
        // catch fits, stumping would overflow and is dropped, drop penalty applies
        assert_eq!(calc_fielding_points(&r, &c), f64::MAX - 5.0);
    }

    #[test]
    fn test_zero_card_scores_zero() {
        let c = FieldingCard::zero(MatchId::new("m1"), None, PlayerId::new("p1"));
        assert_eq!(calc_fielding_points(&rules(), &c), 0.0);
    }
}
