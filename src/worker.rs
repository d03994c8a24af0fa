//! Polling worker: notification, analysis and report loops.
//!
//! Each loop awaits its cycle before waiting for the next tick, so cycles of
//! the same task never overlap. Different loops run concurrently and touch
//! disjoint columns.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::error::{Error, Result};
use crate::services::ai_service::CandidateAnalyzer;
use crate::services::notification_service::Notifier;
use crate::services::queue_service::CandidateQueue;
use crate::services::report_service::HighFitReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing to do.
    Idle,
    /// One record reached its next state.
    Processed,
    /// The cycle gave up; see the log for why.
    Failed,
    /// A report listing this many candidates was emitted.
    Reported(usize),
}

pub struct Worker {
    queue: Arc<dyn CandidateQueue>,
    notifier: Arc<dyn Notifier>,
    analyzer: Option<Arc<dyn CandidateAnalyzer>>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(
        queue: Arc<dyn CandidateQueue>,
        notifier: Arc<dyn Notifier>,
        analyzer: Option<Arc<dyn CandidateAnalyzer>>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            notifier,
            analyzer,
            config,
        }
    }

    /// Sends at most one pending notification. A failed `sent` write leaves
    /// the row pending for the next cycle.
    pub async fn run_notification_cycle(&self) -> CycleOutcome {
        let candidate = match self.queue.next_pending_notification().await {
            Ok(Some(c)) => c,
            Ok(None) => return CycleOutcome::Idle,
            Err(e) => {
                error!(error = %e, "failed to fetch pending notification");
                return CycleOutcome::Failed;
            }
        };

        info!(candidate_id = %candidate.id, name = %candidate.name, "processing notification");

        if let Err(e) = self.notifier.notify(&candidate).await {
            warn!(candidate_id = %candidate.id, error = %e, "notification dispatch failed");
            return CycleOutcome::Failed;
        }

        match self.queue.mark_notification_sent(candidate.id).await {
            Ok(true) => {
                info!(candidate_id = %candidate.id, "notification marked as sent");
                CycleOutcome::Processed
            }
            Ok(false) => {
                warn!(candidate_id = %candidate.id, "notification was no longer pending");
                CycleOutcome::Idle
            }
            Err(e) => {
                error!(candidate_id = %candidate.id, error = %e, "failed to mark notification as sent");
                CycleOutcome::Failed
            }
        }
    }

    /// Claims at most one pending analysis and drives it to a terminal state.
    pub async fn run_analysis_cycle(&self) -> CycleOutcome {
        let Some(analyzer) = self.analyzer.as_ref() else {
            return CycleOutcome::Idle;
        };

        if let Some(stale_after) = self.config.analysis_stale_after {
            match self.queue.release_stale_analyses(stale_after).await {
                Ok(0) => {}
                Ok(released) => warn!(released, "released stale analyses back to pending"),
                Err(e) => error!(error = %e, "failed to release stale analyses"),
            }
        }

        let job = match self.queue.claim_pending_analysis().await {
            Ok(Some(job)) => job,
            Ok(None) => return CycleOutcome::Idle,
            Err(e) => {
                error!(error = %e, "failed to claim pending analysis");
                return CycleOutcome::Failed;
            }
        };

        info!(candidate_id = %job.id, name = %job.name, "analysis claimed");

        let timeout = self.config.analysis_timeout;
        let result = match tokio::time::timeout(timeout, analyzer.analyze(&job)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Internal(format!(
                "analysis timed out after {}s",
                timeout.as_secs_f32()
            ))),
        };

        match result {
            Ok(analysis) => match self.queue.complete_analysis(job.id, &analysis).await {
                Ok(true) => {
                    info!(candidate_id = %job.id, "analysis completed");
                    CycleOutcome::Processed
                }
                Ok(false) => {
                    warn!(candidate_id = %job.id, "analysis row left processing state, result dropped");
                    CycleOutcome::Failed
                }
                Err(e) => {
                    error!(candidate_id = %job.id, error = %e, "failed to store analysis");
                    CycleOutcome::Failed
                }
            },
            Err(e) => {
                warn!(candidate_id = %job.id, error = %e, "analysis failed");
                if let Err(db_err) = self.queue.fail_analysis(job.id).await {
                    error!(candidate_id = %job.id, error = %db_err, "failed to mark analysis as failed");
                }
                CycleOutcome::Failed
            }
        }
    }

    pub async fn build_report(&self) -> Result<Option<HighFitReport>> {
        let threshold = self.config.report_threshold;
        let rows = self.queue.high_fit_candidates(threshold).await?;
        Ok(HighFitReport::build(threshold, rows, chrono::Utc::now()))
    }

    /// Emits the high-fit report. A query error skips the cycle entirely.
    pub async fn run_report_cycle(&self) -> CycleOutcome {
        match self.build_report().await {
            Ok(Some(report)) => {
                info!(count = report.len(), "\n{}", report);
                CycleOutcome::Reported(report.len())
            }
            Ok(None) => {
                info!(threshold = self.config.report_threshold, "no high-fit candidates to report");
                CycleOutcome::Idle
            }
            Err(e) => {
                error!(error = %e, "failed to query candidates for report");
                CycleOutcome::Failed
            }
        }
    }

    /// Starts one task per loop. They stop when `shutdown` flips to `true`.
    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(3);

        let worker = Arc::clone(&self);
        handles.push(tokio::spawn(run_loop(
            "notification",
            self.config.notification_interval,
            shutdown.clone(),
            move || {
                let worker = Arc::clone(&worker);
                async move { worker.run_notification_cycle().await }
            },
        )));

        if self.analyzer.is_some() {
            let worker = Arc::clone(&self);
            handles.push(tokio::spawn(run_loop(
                "analysis",
                self.config.analysis_interval,
                shutdown.clone(),
                move || {
                    let worker = Arc::clone(&worker);
                    async move { worker.run_analysis_cycle().await }
                },
            )));
        } else {
            warn!("OPENAI_API_KEY not set, analysis loop disabled");
        }

        let worker = Arc::clone(&self);
        handles.push(tokio::spawn(run_loop(
            "report",
            self.config.report_interval,
            shutdown,
            move || {
                let worker = Arc::clone(&worker);
                async move { worker.run_report_cycle().await }
            },
        )));

        handles
    }
}

async fn run_loop<F, Fut>(
    task: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut cycle: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = CycleOutcome>,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(task, every_secs = period.as_secs(), "worker loop started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let outcome = cycle().await;
                debug!(task, ?outcome, "cycle finished");
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!(task, "worker loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::candidate::{
        AnalysisJob, AnalysisStatus, HighFitCandidate, NotificationStatus, PendingNotification,
    };
    use crate::services::ai_service::MockCandidateAnalyzer;
    use crate::services::notification_service::{LogNotifier, MockNotifier};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Debug, Clone)]
    struct Row {
        id: Uuid,
        name: String,
        email: String,
        fit_score: i32,
        classification: String,
        profile_summary: Option<String>,
        notification: NotificationStatus,
        analysis: AnalysisStatus,
        llm_analysis: Option<String>,
        started_at: Option<std::time::Instant>,
    }

    #[derive(Default)]
    struct MemoryQueue {
        rows: Mutex<Vec<Row>>,
        writes: Mutex<usize>,
        fail_reads: bool,
        fail_writes: bool,
    }

    impl MemoryQueue {
        fn with_rows(scores: &[i32]) -> Self {
            let rows = scores
                .iter()
                .enumerate()
                .map(|(i, score)| Row {
                    id: Uuid::new_v4(),
                    name: format!("Candidate {}", i),
                    email: format!("c{}@example.com", i),
                    fit_score: *score,
                    classification: "Ideal".into(),
                    profile_summary: Some("Rust engineer".into()),
                    notification: NotificationStatus::Pending,
                    analysis: AnalysisStatus::Pending,
                    llm_analysis: None,
                    started_at: None,
                })
                .collect();
            Self {
                rows: Mutex::new(rows),
                ..Default::default()
            }
        }

        fn row(&self, idx: usize) -> Row {
            self.rows.lock().unwrap()[idx].clone()
        }

        fn writes(&self) -> usize {
            *self.writes.lock().unwrap()
        }

        fn write(&self) -> Result<()> {
            if self.fail_writes {
                return Err(Error::Internal("store unavailable".into()));
            }
            *self.writes.lock().unwrap() += 1;
            Ok(())
        }

        fn read(&self) -> Result<()> {
            if self.fail_reads {
                return Err(Error::Internal("store unavailable".into()));
            }
            Ok(())
        }

        fn transition(
            &self,
            id: Uuid,
            from: AnalysisStatus,
            to: AnalysisStatus,
            text: Option<&str>,
        ) -> Result<bool> {
            self.write()?;
            let mut rows = self.rows.lock().unwrap();
            match rows.iter_mut().find(|r| r.id == id && r.analysis == from) {
                Some(r) => {
                    r.analysis = to;
                    r.llm_analysis = text.map(String::from);
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    #[async_trait]
    impl CandidateQueue for MemoryQueue {
        async fn next_pending_notification(&self) -> Result<Option<PendingNotification>> {
            self.read()?;
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.notification == NotificationStatus::Pending)
                .map(|r| PendingNotification {
                    id: r.id,
                    name: r.name.clone(),
                    email: r.email.clone(),
                    fit_score_classification: r.classification.clone(),
                }))
        }

        async fn mark_notification_sent(&self, id: Uuid) -> Result<bool> {
            self.write()?;
            let mut rows = self.rows.lock().unwrap();
            match rows
                .iter_mut()
                .find(|r| r.id == id && r.notification == NotificationStatus::Pending)
            {
                Some(r) => {
                    r.notification = NotificationStatus::Sent;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn claim_pending_analysis(&self) -> Result<Option<AnalysisJob>> {
            self.read()?;
            let mut rows = self.rows.lock().unwrap();
            let Some(r) = rows.iter_mut().find(|r| r.analysis == AnalysisStatus::Pending) else {
                return Ok(None);
            };
            r.analysis = AnalysisStatus::Processing;
            r.started_at = Some(std::time::Instant::now());
            *self.writes.lock().unwrap() += 1;
            Ok(Some(AnalysisJob {
                id: r.id,
                name: r.name.clone(),
                seniority: "Senior".into(),
                profile_summary: r.profile_summary.clone(),
            }))
        }

        async fn complete_analysis(&self, id: Uuid, analysis: &str) -> Result<bool> {
            self.transition(id, AnalysisStatus::Processing, AnalysisStatus::Completed, Some(analysis))
        }

        async fn fail_analysis(&self, id: Uuid) -> Result<bool> {
            self.transition(id, AnalysisStatus::Processing, AnalysisStatus::Failed, None)
        }

        async fn release_stale_analyses(&self, older_than: Duration) -> Result<u64> {
            let mut rows = self.rows.lock().unwrap();
            let mut released = 0;
            for r in rows.iter_mut().filter(|r| r.analysis == AnalysisStatus::Processing) {
                if r.started_at.map_or(false, |t| t.elapsed() >= older_than) {
                    r.analysis = AnalysisStatus::Pending;
                    r.started_at = None;
                    released += 1;
                }
            }
            *self.writes.lock().unwrap() += released as usize;
            Ok(released)
        }

        async fn high_fit_candidates(&self, threshold: i32) -> Result<Vec<HighFitCandidate>> {
            self.read()?;
            let mut rows: Vec<_> = self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.fit_score >= threshold)
                .map(|r| HighFitCandidate {
                    name: r.name.clone(),
                    email: r.email.clone(),
                    fit_score: r.fit_score,
                })
                .collect();
            rows.sort_by(|a, b| b.fit_score.cmp(&a.fit_score));
            Ok(rows)
        }
    }

    struct SlowAnalyzer;

    #[async_trait]
    impl CandidateAnalyzer for SlowAnalyzer {
        async fn analyze(&self, _job: &AnalysisJob) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("too late".into())
        }
    }

    fn config() -> WorkerConfig {
        WorkerConfig {
            analysis_timeout: Duration::from_millis(50),
            analysis_stale_after: None,
            ..WorkerConfig::default()
        }
    }

    fn worker(queue: Arc<MemoryQueue>, analyzer: Option<Arc<dyn CandidateAnalyzer>>) -> Worker {
        Worker::new(queue, Arc::new(LogNotifier::new()), analyzer, config())
    }

    #[tokio::test]
    async fn analysis_moves_pending_through_processing_to_completed() {
        let queue = Arc::new(MemoryQueue::with_rows(&[70]));
        let observer = Arc::clone(&queue);

        let mut analyzer = MockCandidateAnalyzer::new();
        analyzer.expect_analyze().times(1).returning(move |job| {
            assert_eq!(observer.row(0).analysis, AnalysisStatus::Processing);
            assert_eq!(job.profile_summary.as_deref(), Some("Rust engineer"));
            Ok("Strong systems background.".to_string())
        });

        let w = worker(Arc::clone(&queue), Some(Arc::new(analyzer)));
        assert_eq!(w.run_analysis_cycle().await, CycleOutcome::Processed);

        let row = queue.row(0);
        assert_eq!(row.analysis, AnalysisStatus::Completed);
        assert!(row.analysis.is_terminal());
        assert_eq!(row.llm_analysis.as_deref(), Some("Strong systems background."));

        // Terminal rows are never picked up again.
        assert_eq!(w.run_analysis_cycle().await, CycleOutcome::Idle);
        assert_eq!(queue.row(0).analysis, AnalysisStatus::Completed);
    }

    #[tokio::test]
    async fn analysis_error_marks_failed_without_text() {
        let queue = Arc::new(MemoryQueue::with_rows(&[70]));
        let mut analyzer = MockCandidateAnalyzer::new();
        analyzer
            .expect_analyze()
            .times(1)
            .returning(|_| Err(Error::Internal("model unavailable".into())));

        let w = worker(Arc::clone(&queue), Some(Arc::new(analyzer)));
        assert_eq!(w.run_analysis_cycle().await, CycleOutcome::Failed);

        let row = queue.row(0);
        assert_eq!(row.analysis, AnalysisStatus::Failed);
        assert_eq!(row.llm_analysis, None);

        // Failures are not retried.
        assert_eq!(w.run_analysis_cycle().await, CycleOutcome::Idle);
        assert_eq!(queue.row(0).analysis, AnalysisStatus::Failed);
    }

    #[tokio::test]
    async fn analysis_timeout_counts_as_failure() {
        let queue = Arc::new(MemoryQueue::with_rows(&[70]));
        let w = worker(Arc::clone(&queue), Some(Arc::new(SlowAnalyzer)));

        assert_eq!(w.run_analysis_cycle().await, CycleOutcome::Failed);
        assert_eq!(queue.row(0).analysis, AnalysisStatus::Failed);
    }

    #[tokio::test]
    async fn empty_queue_performs_no_writes() {
        let queue = Arc::new(MemoryQueue::default());
        let mut analyzer = MockCandidateAnalyzer::new();
        analyzer.expect_analyze().never();

        let w = Worker::new(
            Arc::clone(&queue) as Arc<dyn CandidateQueue>,
            Arc::new(LogNotifier::new()),
            Some(Arc::new(analyzer)),
            WorkerConfig::default(),
        );
        assert!(w.config.analysis_stale_after.is_some());
        assert_eq!(w.run_analysis_cycle().await, CycleOutcome::Idle);
        assert_eq!(w.run_notification_cycle().await, CycleOutcome::Idle);
        assert_eq!(queue.writes(), 0);
    }

    #[tokio::test]
    async fn in_flight_claims_are_left_alone_within_the_stale_window() {
        let queue = Arc::new(MemoryQueue::with_rows(&[70]));
        {
            let mut rows = queue.rows.lock().unwrap();
            rows[0].analysis = AnalysisStatus::Processing;
            rows[0].started_at = Some(std::time::Instant::now());
        }
        let mut analyzer = MockCandidateAnalyzer::new();
        analyzer.expect_analyze().never();

        let w = Worker::new(
            Arc::clone(&queue) as Arc<dyn CandidateQueue>,
            Arc::new(LogNotifier::new()),
            Some(Arc::new(analyzer)),
            WorkerConfig::default(),
        );
        assert_eq!(w.run_analysis_cycle().await, CycleOutcome::Idle);
        assert_eq!(queue.row(0).analysis, AnalysisStatus::Processing);
        assert_eq!(queue.writes(), 0);
    }

    #[tokio::test]
    async fn store_errors_end_the_cycle_without_side_effects() {
        let queue = Arc::new(MemoryQueue {
            fail_reads: true,
            ..MemoryQueue::with_rows(&[90])
        });
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();
        let mut analyzer = MockCandidateAnalyzer::new();
        analyzer.expect_analyze().never();

        let w = Worker::new(
            Arc::clone(&queue) as Arc<dyn CandidateQueue>,
            Arc::new(notifier),
            Some(Arc::new(analyzer)),
            config(),
        );
        assert_eq!(w.run_notification_cycle().await, CycleOutcome::Failed);
        assert_eq!(w.run_analysis_cycle().await, CycleOutcome::Failed);
        assert_eq!(w.run_report_cycle().await, CycleOutcome::Failed);
        assert_eq!(queue.writes(), 0);
    }

    #[tokio::test]
    async fn notification_is_sent_once_per_cycle() {
        let queue = Arc::new(MemoryQueue::with_rows(&[90, 40]));
        let first = queue.row(0);

        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .times(2)
            .returning(|_| Ok(()));

        let w = Worker::new(
            Arc::clone(&queue) as Arc<dyn CandidateQueue>,
            Arc::new(notifier),
            None,
            config(),
        );

        assert_eq!(w.run_notification_cycle().await, CycleOutcome::Processed);
        assert_eq!(queue.row(0).notification, NotificationStatus::Sent);
        assert_eq!(queue.row(1).notification, NotificationStatus::Pending);
        assert_eq!(queue.row(0).id, first.id);

        assert_eq!(w.run_notification_cycle().await, CycleOutcome::Processed);
        assert_eq!(queue.row(1).notification, NotificationStatus::Sent);
        assert_eq!(w.run_notification_cycle().await, CycleOutcome::Idle);
    }

    #[tokio::test]
    async fn failed_sent_write_leaves_notification_pending_for_retry() {
        let queue = Arc::new(MemoryQueue {
            fail_writes: true,
            ..MemoryQueue::with_rows(&[90])
        });
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(2).returning(|_| Ok(()));

        let w = Worker::new(
            Arc::clone(&queue) as Arc<dyn CandidateQueue>,
            Arc::new(notifier),
            None,
            config(),
        );
        assert_eq!(w.run_notification_cycle().await, CycleOutcome::Failed);
        assert_eq!(queue.row(0).notification, NotificationStatus::Pending);
        assert_eq!(w.run_notification_cycle().await, CycleOutcome::Failed);
    }

    #[tokio::test]
    async fn report_lists_only_high_fit_candidates() {
        let queue = Arc::new(MemoryQueue::with_rows(&[95, 80, 79, 60]));
        let w = worker(Arc::clone(&queue), None);

        let report = w.build_report().await.unwrap().expect("report");
        let scores: Vec<i32> = report.candidates.iter().map(|c| c.fit_score).collect();
        assert_eq!(scores, vec![95, 80]);
        assert_eq!(w.run_report_cycle().await, CycleOutcome::Reported(2));
    }

    #[tokio::test]
    async fn report_with_no_qualifying_candidates_is_idle() {
        let queue = Arc::new(MemoryQueue::with_rows(&[79, 10]));
        let w = worker(queue, None);
        assert_eq!(w.run_report_cycle().await, CycleOutcome::Idle);
    }

    #[tokio::test]
    async fn stale_processing_rows_are_released_and_reclaimed() {
        let queue = Arc::new(MemoryQueue::with_rows(&[70]));
        {
            let mut rows = queue.rows.lock().unwrap();
            rows[0].analysis = AnalysisStatus::Processing;
            rows[0].started_at = Some(std::time::Instant::now());
        }

        let mut analyzer = MockCandidateAnalyzer::new();
        analyzer
            .expect_analyze()
            .times(1)
            .returning(|_| Ok("Recovered.".to_string()));

        let w = Worker::new(
            Arc::clone(&queue) as Arc<dyn CandidateQueue>,
            Arc::new(LogNotifier::new()),
            Some(Arc::new(analyzer)),
            WorkerConfig {
                analysis_stale_after: Some(Duration::ZERO),
                ..config()
            },
        );

        assert_eq!(w.run_analysis_cycle().await, CycleOutcome::Processed);
        assert_eq!(queue.row(0).analysis, AnalysisStatus::Completed);
        // release, claim, complete
        assert_eq!(queue.writes(), 3);
    }

    #[tokio::test]
    async fn analysis_cycle_without_analyzer_is_idle() {
        let queue = Arc::new(MemoryQueue::with_rows(&[70]));
        let w = worker(Arc::clone(&queue), None);
        assert_eq!(w.run_analysis_cycle().await, CycleOutcome::Idle);
        assert_eq!(queue.row(0).analysis, AnalysisStatus::Pending);
    }

    #[tokio::test]
    async fn loops_stop_on_shutdown() {
        let queue = Arc::new(MemoryQueue::default());
        let w = Arc::new(worker(queue, None));
        let (tx, rx) = watch::channel(false);

        let handles = w.spawn(rx);
        assert_eq!(handles.len(), 2);

        tx.send(true).unwrap();
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .expect("loop should stop")
                .expect("loop should not panic");
        }
    }
}
