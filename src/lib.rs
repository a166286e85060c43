pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod store;

pub use config::Config;
pub use db::{init_db, init_db_with, Repository};
pub use domain::{
    BattingCard, BowlingCard, ClubId, DateRange, Dismissal, FieldingCard, Formula, FormulaRules,
    FormulaVersionId, MatchId, MatchInfo, Metric, PlayerId, PointsEvent, Season, SeasonId, TeamId,
};
pub use engine::{calc_batting_points, calc_bowling_points, calc_fielding_points, ScoreSheet};
pub use error::AppError;
pub use orchestration::{ensure_zero_rows, get_active_formula, Orchestrator, Recomputer};
pub use store::{MemoryStore, ScoringStore, StoreError};
