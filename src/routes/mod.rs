pub mod candidate_routes;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{cors::fitscore_cors, rate_limit};
use crate::AppState;

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/skills", get(candidate_routes::list_skills))
        .route(
            "/candidates",
            get(candidate_routes::list_candidates).post(candidate_routes::create_candidate),
        )
        .route("/metrics", get(candidate_routes::get_metrics))
}

/// Full application router. Routes are served at the root and under `/api`.
pub fn router(state: AppState, public_rps: u32) -> Router {
    api_routes()
        .nest("/api", api_routes())
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(public_rps),
            rate_limit::rps_middleware,
        ))
        .with_state(state)
        .layer(fitscore_cors())
        .layer(TraceLayer::new_for_http())
}
