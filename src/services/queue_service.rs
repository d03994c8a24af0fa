use crate::error::Result;
use crate::models::candidate::{
    AnalysisJob, AnalysisStatus, HighFitCandidate, NotificationStatus, PendingNotification,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

/// Store operations the polling worker relies on.
///
/// "Nothing pending" is `Ok(None)`, never an error. Terminal writes report
/// whether a row actually moved, so a lost race is visible to the caller.
#[async_trait]
pub trait CandidateQueue: Send + Sync {
    /// Oldest candidate whose notification has not been sent.
    async fn next_pending_notification(&self) -> Result<Option<PendingNotification>>;

    async fn mark_notification_sent(&self, id: Uuid) -> Result<bool>;

    /// Atomically moves the oldest `pending` analysis to `processing`.
    async fn claim_pending_analysis(&self) -> Result<Option<AnalysisJob>>;

    async fn complete_analysis(&self, id: Uuid, analysis: &str) -> Result<bool>;

    async fn fail_analysis(&self, id: Uuid) -> Result<bool>;

    /// Returns rows stuck in `processing` for longer than `older_than` to
    /// `pending`. Yields the number of rows released.
    async fn release_stale_analyses(&self, older_than: Duration) -> Result<u64>;

    /// Candidates scoring at least `threshold`, best first.
    async fn high_fit_candidates(&self, threshold: i32) -> Result<Vec<HighFitCandidate>>;
}

#[derive(Clone)]
pub struct PgCandidateQueue {
    pool: PgPool,
}

impl PgCandidateQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CandidateQueue for PgCandidateQueue {
    async fn next_pending_notification(&self) -> Result<Option<PendingNotification>> {
        let row = sqlx::query_as::<_, PendingNotification>(
            r#"
            SELECT id, name, email, fit_score_classification
            FROM candidates
            WHERE notification_status = $1
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(NotificationStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn mark_notification_sent(&self, id: Uuid) -> Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE candidates
            SET notification_status = $1, updated_at = NOW()
            WHERE id = $2 AND notification_status = $3
            "#,
        )
        .bind(NotificationStatus::Sent.as_str())
        .bind(id)
        .bind(NotificationStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn claim_pending_analysis(&self) -> Result<Option<AnalysisJob>> {
        let job = sqlx::query_as::<_, AnalysisJob>(
            r#"
            UPDATE candidates
            SET llm_analysis_status = $1, analysis_started_at = NOW(), updated_at = NOW()
            WHERE id = (
                SELECT id FROM candidates
                WHERE llm_analysis_status = $2
                ORDER BY created_at ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING id, name, seniority, profile_summary
            "#,
        )
        .bind(AnalysisStatus::Processing.as_str())
        .bind(AnalysisStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    async fn complete_analysis(&self, id: Uuid, analysis: &str) -> Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE candidates
            SET llm_analysis_status = $1, llm_analysis = $2, updated_at = NOW()
            WHERE id = $3 AND llm_analysis_status = $4
            "#,
        )
        .bind(AnalysisStatus::Completed.as_str())
        .bind(analysis)
        .bind(id)
        .bind(AnalysisStatus::Processing.as_str())
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn fail_analysis(&self, id: Uuid) -> Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE candidates
            SET llm_analysis_status = $1, llm_analysis = NULL, updated_at = NOW()
            WHERE id = $2 AND llm_analysis_status = $3
            "#,
        )
        .bind(AnalysisStatus::Failed.as_str())
        .bind(id)
        .bind(AnalysisStatus::Processing.as_str())
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn release_stale_analyses(&self, older_than: Duration) -> Result<u64> {
        let res = sqlx::query(
            r#"
            UPDATE candidates
            SET llm_analysis_status = $1, analysis_started_at = NULL, updated_at = NOW()
            WHERE llm_analysis_status = $2
              AND analysis_started_at < NOW() - make_interval(secs => $3)
            "#,
        )
        .bind(AnalysisStatus::Pending.as_str())
        .bind(AnalysisStatus::Processing.as_str())
        .bind(older_than.as_secs_f64())
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }

    async fn high_fit_candidates(&self, threshold: i32) -> Result<Vec<HighFitCandidate>> {
        let rows = sqlx::query_as::<_, HighFitCandidate>(
            r#"
            SELECT name, email, fit_score
            FROM candidates
            WHERE fit_score >= $1
            ORDER BY fit_score DESC, name ASC
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
