pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;
pub mod worker;

use crate::services::{candidate_service::CandidateService, scoring::ScoringModel};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub candidate_service: CandidateService,
    pub scoring_model: ScoringModel,
}

impl AppState {
    pub fn new(pool: PgPool, scoring_model: ScoringModel) -> Self {
        let candidate_service = CandidateService::new(pool.clone());

        Self {
            pool,
            candidate_service,
            scoring_model,
        }
    }
}
