use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::candidate::Candidate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCandidatePayload {
    #[validate(length(min = 1, message = "name is required"))]
    #[serde(default)]
    pub name: String,
    #[validate(email(message = "email must be a valid address"))]
    #[serde(default)]
    pub email: String,
    pub phone: Option<String>,
    #[validate(length(min = 1, message = "seniority is required"))]
    #[serde(default)]
    pub seniority: String,
    #[validate(length(min = 1, message = "profile_summary is required"))]
    #[serde(default)]
    pub profile_summary: String,
    #[validate(length(min = 1, message = "at least one skill is required"))]
    #[serde(default, rename = "skillIds", alias = "skills")]
    pub skill_ids: Vec<Uuid>,
    #[validate(range(min = 0, max = 100))]
    pub performance: Option<i16>,
    #[validate(range(min = 0, max = 100))]
    pub energy: Option<i16>,
    #[validate(range(min = 0, max = 100))]
    pub culture: Option<i16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateFilter {
    pub classification: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateCandidateResponse {
    pub message: String,
    pub data: Candidate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    pub total_candidates: i64,
    pub average_fit_score: f64,
}
