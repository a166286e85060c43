pub mod formulas;
pub mod health;
pub mod leaderboard;
pub mod matches;
pub mod recompute;

use crate::orchestration::Orchestrator;
use crate::store::ScoringStore;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    pub fn store(&self) -> &Arc<dyn ScoringStore> {
        self.orchestrator.store()
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/v1/formulas",
            get(formulas::list_formulas).post(formulas::publish_formula),
        )
        .route("/v1/formulas/active", get(formulas::get_active_formula))
        .route("/v1/formulas/:id", get(formulas::get_formula))
        .route("/v1/formulas/:id/activate", post(formulas::activate_formula))
        .route("/v1/recompute/season", post(recompute::recompute_season))
        .route("/v1/recompute/match", post(recompute::recompute_match))
        .route("/v1/matches/:match_id/roster", post(matches::import_roster))
        .route("/v1/matches/:match_id/points", get(matches::get_match_points))
        .route("/v1/leaderboard", get(leaderboard::get_leaderboard))
        .layer(cors)
        .with_state(state)
}
