use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::skill::SkillName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Sent,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Sent => "sent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Candidate {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub seniority: String,
    pub profile_summary: Option<String>,
    pub performance: Option<i16>,
    pub energy: Option<i16>,
    pub culture: Option<i16>,
    pub fit_score: i32,
    pub fit_score_classification: String,
    pub notification_status: String,
    pub llm_analysis_status: String,
    pub llm_analysis: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing row: the candidate plus its skill names.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateWithSkills {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub candidate: Candidate,
    pub skills: Json<Vec<SkillName>>,
}

/// What the notification loop needs to address a candidate.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PendingNotification {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub fit_score_classification: String,
}

/// A row claimed by the analysis loop.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct AnalysisJob {
    pub id: Uuid,
    pub name: String,
    pub seniority: String,
    pub profile_summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct HighFitCandidate {
    pub name: String,
    pub email: String,
    pub fit_score: i32,
}
