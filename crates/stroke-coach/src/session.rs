/// Session controller: wires a started job through the poller to the
/// parsed report.
///
/// One session per job identifier. The controller forwards each progress
/// snapshot to the consumer, and on completion fetches the report text
/// exactly once and parses it. An analysis failure reported by the service
/// is terminal; a report-fetch failure after completion surfaces as a load
/// error without retrying (the caller can always start a new upload).
use std::sync::Arc;

use tracing::info;

use coach_common::api::{AnalysisApi, ProgressSnapshot};

use crate::error::AppError;
use crate::model::AnalysisReport;
use crate::parser;
use crate::poller::{self, PollEvent, PollerConfig};

pub struct SessionController<A: AnalysisApi> {
    api: Arc<A>,
    poller_config: PollerConfig,
}

impl<A: AnalysisApi> SessionController<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            poller_config: PollerConfig::default(),
        }
    }

    pub fn with_poller_config(api: Arc<A>, poller_config: PollerConfig) -> Self {
        Self { api, poller_config }
    }

    /// Track a job to completion, forwarding each snapshot to
    /// `on_progress`, then fetch and parse the final report.
    pub async fn track<F>(&self, job_id: &str, mut on_progress: F) -> Result<AnalysisReport, AppError>
    where
        F: FnMut(&ProgressSnapshot),
    {
        let (handle, mut events) =
            poller::spawn(Arc::clone(&self.api), job_id, self.poller_config);

        while let Some(event) = events.recv().await {
            match event {
                PollEvent::Progress(snapshot) => on_progress(&snapshot),
                PollEvent::Completed => {
                    let raw = self.api.fetch_report(job_id).await?;
                    info!(job_id = %job_id, bytes = raw.len(), "report fetched");
                    return Ok(parser::parse_report(&raw));
                }
                PollEvent::Failed { message } => {
                    return Err(AppError::AnalysisFailed(message));
                }
            }
        }

        // The event channel closed without a terminal event: the poll
        // session was cancelled out from under us.
        Err(AppError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use coach_common::api::{JobStatus, ProgressSnapshot};
    use coach_common::error::ApiError;
    use coach_common::StatusCode;

    struct FakeService {
        snapshots: Mutex<VecDeque<ProgressSnapshot>>,
        /// `None` makes the report fetch fail.
        report: Option<String>,
    }

    impl FakeService {
        fn new(snapshots: Vec<ProgressSnapshot>, report: Option<String>) -> Arc<Self> {
            Arc::new(Self {
                snapshots: Mutex::new(snapshots.into()),
                report,
            })
        }
    }

    #[async_trait]
    impl AnalysisApi for FakeService {
        async fn job_status(&self, _job_id: &str) -> Result<ProgressSnapshot, ApiError> {
            let next = self.snapshots.lock().unwrap().pop_front();
            match next {
                Some(snapshot) => Ok(snapshot),
                None => std::future::pending().await,
            }
        }

        async fn fetch_report(&self, _job_id: &str) -> Result<String, ApiError> {
            match &self.report {
                Some(text) => Ok(text.clone()),
                None => Err(ApiError::UpstreamBody {
                    status: StatusCode::NOT_FOUND,
                    body: "Report not found".to_string(),
                }),
            }
        }
    }

    fn step(status: JobStatus, progress: u8) -> ProgressSnapshot {
        ProgressSnapshot {
            status,
            progress,
            message: String::new(),
            error: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn tracks_job_and_parses_report() {
        let report_text = "Overall Technique Score: 7/10\n\n📊 QUICK INSIGHT\nNice swim!\n";
        let api = FakeService::new(
            vec![
                step(JobStatus::Pending, 0),
                step(JobStatus::Processing, 60),
                step(JobStatus::Completed, 100),
            ],
            Some(report_text.to_string()),
        );

        let controller = SessionController::new(api);
        let mut seen = Vec::new();
        let report = controller
            .track("job-1", |s| seen.push(s.progress))
            .await
            .unwrap();

        assert_eq!(seen, vec![0, 60, 100]);
        assert_eq!(report.score, Some(7));
        assert_eq!(report.quick_insight.as_deref(), Some("Nice swim!"));
        assert_eq!(report.raw_text, report_text);
    }

    #[tokio::test(start_paused = true)]
    async fn analysis_failure_is_terminal() {
        let api = FakeService::new(
            vec![ProgressSnapshot {
                status: JobStatus::Failed,
                progress: 30,
                message: String::new(),
                error: Some("corrupt video".to_string()),
            }],
            Some(String::new()),
        );

        let controller = SessionController::new(api);
        let err = controller.track("job-2", |_| {}).await.unwrap_err();
        assert!(matches!(err, AppError::AnalysisFailed(m) if m == "corrupt video"));
    }

    #[tokio::test(start_paused = true)]
    async fn report_fetch_failure_surfaces_as_api_error() {
        let api = FakeService::new(vec![step(JobStatus::Completed, 100)], None);

        let controller = SessionController::new(api);
        let err = controller.track("job-3", |_| {}).await.unwrap_err();
        assert!(matches!(err, AppError::Api(_)));
    }
}
