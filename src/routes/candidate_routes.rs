use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::dto::candidate_dto::{CandidateFilter, CreateCandidatePayload, CreateCandidateResponse};
use crate::error::{Error, Result};
use crate::services::candidate_service::NewCandidate;
use crate::utils::validation::validate;
use crate::AppState;

#[axum::debug_handler]
pub async fn create_candidate(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateCandidatePayload>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(payload) = payload.map_err(|e| Error::BadRequest(e.body_text()))?;
    validate(&payload)?;

    let new = NewCandidate::from_payload(payload, state.scoring_model)?;
    let candidate = state
        .candidate_service
        .create_candidate(new, state.scoring_model)
        .await
        .map_err(|e| {
            if e.status_code().is_server_error() {
                tracing::error!("Failed to create candidate: {}", e);
            }
            e
        })?;

    tracing::info!(candidate_id = %candidate.id, score = candidate.fit_score, "candidate created");

    Ok((
        StatusCode::CREATED,
        Json(CreateCandidateResponse {
            message: "Candidate created successfully!".to_string(),
            data: candidate,
        }),
    ))
}

#[axum::debug_handler]
pub async fn list_candidates(
    State(state): State<AppState>,
    Query(filter): Query<CandidateFilter>,
) -> Result<impl IntoResponse> {
    let candidates = state.candidate_service.list_candidates(&filter).await?;
    Ok(Json(candidates))
}

#[axum::debug_handler]
pub async fn list_skills(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let skills = state.candidate_service.list_skills().await?;
    Ok(Json(skills))
}

#[axum::debug_handler]
pub async fn get_metrics(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let metrics = state.candidate_service.get_metrics().await?;
    Ok(Json(metrics))
}
