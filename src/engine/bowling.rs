use crate::domain::{BowlingCard, BowlingRules};

use super::numeric::{accumulate, finite_or_zero, scaled};

/// Runs conceded per over, or `None` when no overs were bowled.
///
/// Overs are taken as recorded, so `8.4` divides by 8.4 rather than 8⅔.
pub fn economy(card: &BowlingCard) -> Option<f64> {
    let overs = finite_or_zero(card.overs);
    if overs <= 0.0 {
        return None;
    }
    let economy = finite_or_zero(card.runs_conceded) / overs;
    economy.is_finite().then_some(economy)
}

/// Bowling points for one spell.
///
/// Haul bonuses are flat and independent: five wickets earn both the
/// three-for and the five-for bonus when both are configured. Every economy
/// band is checked on its own, so overlapping bands all apply.
pub fn calc_bowling_points(rules: &BowlingRules, card: &BowlingCard) -> f64 {
    let wickets = finite_or_zero(card.wickets);

    let mut total = scaled(wickets, rules.per_wicket);
    total = accumulate(total, scaled(card.maidens, rules.maiden_over));

    if wickets >= 3.0 {
        total = accumulate(total, rules.three_for_bonus.unwrap_or(0.0));
    }
    if wickets >= 5.0 {
        total = accumulate(total, rules.five_for_bonus.unwrap_or(0.0));
    }

    if let Some(economy) = economy(card) {
        for band in &rules.economy_bands {
            if band.applies(economy) {
                total = accumulate(total, band.points);
            }
        }
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EconomyBand, MatchId, PlayerId};

    fn card(overs: f64, maidens: f64, runs_conceded: f64, wickets: f64) -> BowlingCard {
        BowlingCard {
            match_id: MatchId::new("m1"),
            player_id: PlayerId::new("p1"),
            team_id: None,
            overs,
            maidens,
            runs_conceded,
            wickets,
        }
    }

    fn rules() -> BowlingRules {
        BowlingRules {
            per_wicket: 20.0,
            maiden_over: 5.0,
            three_for_bonus: Some(10.0),
            five_for_bonus: Some(25.0),
            economy_bands: Vec::new(),
        }
    }

    #[test]
    fn test_wickets_and_maidens() {
        let c = card(6.0, 2.0, 30.0, 2.0);
        assert_eq!(calc_bowling_points(&rules(), &c), 50.0);
    }

    #[test]
    fn test_haul_bonuses_both_apply_at_five() {
        let c = card(10.0, 0.0, 40.0, 5.0);
        // 100 + 10 + 25
        assert_eq!(calc_bowling_points(&rules(), &c), 135.0);
    }

    #[test]
    fn test_three_for_only() {
        let c = card(10.0, 0.0, 40.0, 4.0);
        assert_eq!(calc_bowling_points(&rules(), &c), 90.0);
    }

    #[test]
    fn test_missing_haul_bonuses_are_skipped() {
        let mut r = rules();
        r.three_for_bonus = None;
        r.five_for_bonus = None;
        let c = card(10.0, 0.0, 40.0, 6.0);
        assert_eq!(calc_bowling_points(&r, &c), 120.0);
    }

    #[test]
    fn test_economy_bands_are_independent() {
        let r = BowlingRules {
            economy_bands: vec![EconomyBand::at_most(3.0, 10.0), EconomyBand::at_most(2.0, 5.0)],
            ..BowlingRules::default()
        };
        let c = card(10.0, 0.0, 18.0, 0.0);
        assert_eq!(calc_bowling_points(&r, &c), 15.0);
    }

    #[test]
    fn test_economy_penalty_band() {
        let r = BowlingRules {
            economy_bands: vec![EconomyBand::at_least(9.0, -5.0), EconomyBand::at_most(4.0, 8.0)],
            ..BowlingRules::default()
        };
        let c = card(4.0, 0.0, 44.0, 0.0);
        assert_eq!(calc_bowling_points(&r, &c), -5.0);
    }

    #[test]
    fn test_economy_skipped_without_overs() {
        let r = BowlingRules {
            economy_bands: vec![EconomyBand::at_most(3.0, 10.0)],
            ..BowlingRules::default()
        };
        let c = card(0.0, 0.0, 0.0, 0.0);
        assert_eq!(economy(&c), None);
        assert_eq!(calc_bowling_points(&r, &c), 0.0);
    }

    #[test]
    fn test_economy_uses_recorded_overs() {
        let c = card(8.4, 0.0, 42.0, 0.0);
        assert_eq!(economy(&c), Some(42.0 / 8.4));
    }

    #[test]
    fn test_overflowing_bonus_keeps_wicket_points() {
        let r = BowlingRules {
            per_wicket: f64::MAX,
            three_for_bonus: Some(f64::MAX),
            ..rules()
        };
        let c = card(10.0, 0.0, 40.0, 1.0);
        assert_eq!(calc_bowling_points(&r, &c), f64::MAX);

        let three = card(10.0, 0.0, 40.0, 3.0);
        // 3 x MAX overflows as a product, so only the bonus survives
        assert_eq!(calc_bowling_points(&r, &three), f64::MAX);
    }

    #[test]
    fn test_non_finite_overs_skip_economy() {
        let r = BowlingRules {
            economy_bands: vec![EconomyBand::at_least(0.0, -1.0)],
            ..rules()
        };
        let c = card(f64::NAN, 0.0, 20.0, 1.0);
        assert_eq!(calc_bowling_points(&r, &c), 20.0);
    }
}
