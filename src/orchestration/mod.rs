//! Recompute orchestration.
//!
//! - `resolver` - active formula lookup with club-default fallback
//! - `recompute` - the resolve/collect/load/evaluate/replace pipeline
//! - `ensure` - zero-row completeness for imported rosters
//! - `locks` - per-(club, formula version) serialization
//! - `orchestrator` - trigger entry points wiring the above together

pub mod ensure;
pub mod locks;
pub mod orchestrator;
pub mod recompute;
pub mod resolver;

pub use ensure::{ensure_zero_rows, CompletenessError, CompletenessReport};
pub use locks::{RecomputeGuard, RecomputeLocks};
pub use orchestrator::{
    Leaderboard, OrchestrationError, Orchestrator, PublishOutcome, RosterOutcome, SeasonRecompute,
};
pub use recompute::{
    RecomputeError, RecomputeReport, RecomputeStep, Recomputer, DEFAULT_BATCH_SIZE,
};
pub use resolver::{get_active_formula, ResolveError};
