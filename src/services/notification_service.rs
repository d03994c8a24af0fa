use crate::error::Result;
use crate::models::candidate::PendingNotification;
use async_trait::async_trait;

pub const RESULT_SUBJECT: &str = "Your FitScore evaluation result";

/// Delivers the evaluation result to a candidate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, candidate: &PendingNotification) -> Result<()>;
}

pub fn result_message(candidate: &PendingNotification) -> String {
    format!(
        "Hello {}, the result of your evaluation was: {}.",
        candidate.name, candidate.fit_score_classification
    )
}

/// Simulated e-mail delivery: the message is written to the log.
#[derive(Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, candidate: &PendingNotification) -> Result<()> {
        tracing::info!(
            candidate_id = %candidate.id,
            to = %candidate.email,
            subject = RESULT_SUBJECT,
            body = %result_message(candidate),
            "simulated e-mail sent"
        );
        Ok(())
    }
}
