//! Domain types for the scoring engine.
//!
//! This module provides:
//! - Identifier newtypes and inclusive date ranges
//! - Versioned formulas and their rule sections
//! - Raw batting/bowling/fielding cards
//! - Derived points events
//! - Seasons and matches

pub mod card;
pub mod fixture;
pub mod formula;
pub mod points;
pub mod primitives;

pub use card::{BattingCard, BowlingCard, Discipline, Dismissal, FieldingCard};
pub use fixture::{MatchInfo, Season};
pub use formula::{
    BandCondition, BattingRules, BowlingRules, EconomyBand, FieldingRules, Formula, FormulaError,
    FormulaRules, Milestone,
};
pub use points::{Metric, PlayerTotal, PointsEvent};
pub use primitives::{ClubId, DateRange, FormulaVersionId, MatchId, PlayerId, SeasonId, TeamId};
