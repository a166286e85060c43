//! Recompute pipeline: resolve, collect scope, load cards, evaluate, replace.
//!
//! A run is a single pass with no retries. Stored events for the scope are
//! replaced by deleting everything for `(scope matches, formula version)` and
//! then inserting the fresh rows in fixed-size batches. If an insert batch
//! fails after the delete, the scope is left with fewer events than it
//! should have until the run is repeated; the returned error names the step
//! so callers can show the previous standings as stale.

use crate::domain::{ClubId, DateRange, Formula, FormulaVersionId, MatchId, SeasonId};
use crate::engine::ScoreSheet;
use crate::orchestration::locks::RecomputeLocks;
use crate::orchestration::resolver::{get_active_formula, ResolveError};
use crate::store::{ScoringStore, StoreError};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

/// Default number of events per `insert_events` call.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Pipeline step a recompute failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecomputeStep {
    Resolve,
    CollectScope,
    LoadCards,
    DeleteEvents,
    /// Zero-based index of the insert batch that failed.
    InsertEvents { batch: usize },
}

impl fmt::Display for RecomputeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecomputeStep::Resolve => write!(f, "resolve"),
            RecomputeStep::CollectScope => write!(f, "collect scope"),
            RecomputeStep::LoadCards => write!(f, "load cards"),
            RecomputeStep::DeleteEvents => write!(f, "delete events"),
            RecomputeStep::InsertEvents { batch } => write!(f, "insert events (batch {})", batch),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecomputeError {
    #[error(transparent)]
    NoActiveFormula(ResolveError),
    #[error("match not found: {0}")]
    MatchNotFound(MatchId),
    #[error("recompute failed at {step}: {source}")]
    Read {
        step: RecomputeStep,
        source: StoreError,
    },
    #[error("recompute failed at {step}: {source}")]
    Write {
        step: RecomputeStep,
        source: StoreError,
    },
}

impl RecomputeError {
    /// The step a store failure happened in, if this is a store failure.
    pub fn step(&self) -> Option<RecomputeStep> {
        match self {
            RecomputeError::Read { step, .. } | RecomputeError::Write { step, .. } => Some(*step),
            _ => None,
        }
    }
}

impl From<ResolveError> for RecomputeError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Store(source) => RecomputeError::Read {
                step: RecomputeStep::Resolve,
                source,
            },
            other => RecomputeError::NoActiveFormula(other),
        }
    }
}

fn read(step: RecomputeStep) -> impl FnOnce(StoreError) -> RecomputeError {
    move |source| RecomputeError::Read { step, source }
}

fn write(step: RecomputeStep) -> impl FnOnce(StoreError) -> RecomputeError {
    move |source| RecomputeError::Write { step, source }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeReport {
    pub run_id: Uuid,
    pub formula_version_id: FormulaVersionId,
    pub matches: usize,
    pub events_inserted: u64,
    pub events_deleted: u64,
    /// Cards whose non-finite stats were clamped to zero.
    pub anomalies: usize,
}

/// Runs recomputes against a store, one `(club, formula version)` at a time.
#[derive(Debug, Clone)]
pub struct Recomputer {
    store: Arc<dyn ScoringStore>,
    locks: RecomputeLocks,
    batch_size: usize,
}

impl Recomputer {
    pub fn new(store: Arc<dyn ScoringStore>, batch_size: usize) -> Self {
        Self {
            store,
            locks: RecomputeLocks::new(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Recompute every club match dated inside `range` under the formula
    /// active for `(club_id, season_id)`.
    pub async fn recompute_season_points(
        &self,
        club_id: &ClubId,
        season_id: Option<&SeasonId>,
        range: DateRange,
    ) -> Result<RecomputeReport, RecomputeError> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "recompute",
            %run_id,
            club_id = %club_id,
            season_id = season_id.map(|s| s.as_str()).unwrap_or("")
        );

        self.season_run(run_id, club_id, season_id, range)
            .instrument(span)
            .await
    }

    /// Recompute a single match under the formula active for its club and
    /// season.
    pub async fn recompute_match(
        &self,
        match_id: &MatchId,
    ) -> Result<RecomputeReport, RecomputeError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("recompute", %run_id, match_id = %match_id);

        self.match_run(run_id, match_id).instrument(span).await
    }

    async fn season_run(
        &self,
        run_id: Uuid,
        club_id: &ClubId,
        season_id: Option<&SeasonId>,
        range: DateRange,
    ) -> Result<RecomputeReport, RecomputeError> {
        let formula = self.resolve(club_id, season_id).await?;

        let matches = self
            .store
            .list_matches(club_id, range)
            .await
            .map_err(read(RecomputeStep::CollectScope))?;
        let match_ids: Vec<MatchId> = matches.into_iter().map(|m| m.id).collect();
        debug!(matches = match_ids.len(), start = %range.start, end = %range.end, "Collected scope");

        self.run(run_id, &formula, match_ids).await
    }

    async fn match_run(
        &self,
        run_id: Uuid,
        match_id: &MatchId,
    ) -> Result<RecomputeReport, RecomputeError> {
        let info = self
            .store
            .get_match(match_id)
            .await
            .map_err(read(RecomputeStep::CollectScope))?
            .ok_or_else(|| RecomputeError::MatchNotFound(match_id.clone()))?;

        let formula = self.resolve(&info.club_id, info.season_id.as_ref()).await?;
        self.run(run_id, &formula, vec![info.id]).await
    }

    async fn resolve(
        &self,
        club_id: &ClubId,
        season_id: Option<&SeasonId>,
    ) -> Result<Formula, RecomputeError> {
        let formula = get_active_formula(self.store.as_ref(), club_id, season_id).await?;
        debug!(formula_id = %formula.id, version = formula.version, "Resolved formula");
        Ok(formula)
    }

    async fn run(
        &self,
        run_id: Uuid,
        formula: &Formula,
        match_ids: Vec<MatchId>,
    ) -> Result<RecomputeReport, RecomputeError> {
        let mut report = RecomputeReport {
            run_id,
            formula_version_id: formula.id,
            matches: match_ids.len(),
            events_inserted: 0,
            events_deleted: 0,
            anomalies: 0,
        };

        if match_ids.is_empty() {
            info!("No matches in scope, nothing to recompute");
            return Ok(report);
        }

        let _guard = self.locks.acquire(&formula.club_id, formula.id).await;

        let batting = self
            .store
            .list_batting_cards(&match_ids)
            .await
            .map_err(read(RecomputeStep::LoadCards))?;
        let bowling = self
            .store
            .list_bowling_cards(&match_ids)
            .await
            .map_err(read(RecomputeStep::LoadCards))?;
        let fielding = self
            .store
            .list_fielding_cards(&match_ids)
            .await
            .map_err(read(RecomputeStep::LoadCards))?;
        debug!(
            batting = batting.len(),
            bowling = bowling.len(),
            fielding = fielding.len(),
            "Loaded cards"
        );

        let mut sheet = ScoreSheet::new(formula);
        batting.iter().for_each(|c| sheet.add_batting(c));
        bowling.iter().for_each(|c| sheet.add_bowling(c));
        fielding.iter().for_each(|c| sheet.add_fielding(c));
        report.anomalies = sheet.anomalies();
        let events = sheet.into_events();
        debug!(events = events.len(), anomalies = report.anomalies, "Evaluated cards");

        report.events_deleted = self
            .store
            .delete_events(&match_ids, formula.id)
            .await
            .map_err(write(RecomputeStep::DeleteEvents))?;

        for (batch, chunk) in events.chunks(self.batch_size).enumerate() {
            report.events_inserted += self
                .store
                .insert_events(chunk)
                .await
                .map_err(write(RecomputeStep::InsertEvents { batch }))?;
        }
        debug!(
            deleted = report.events_deleted,
            inserted = report.events_inserted,
            "Replaced events"
        );

        info!(
            formula_id = %formula.id,
            matches = report.matches,
            events_inserted = report.events_inserted,
            events_deleted = report.events_deleted,
            anomalies = report.anomalies,
            "Recompute complete"
        );

        Ok(report)
    }
}
