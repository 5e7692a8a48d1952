/// Progress poller for one analysis job.
///
/// Drives a repeating status check against the analysis service and turns
/// the snapshot stream into lifecycle events with exactly-once terminal
/// signaling. The loop owns a single timer and issues at most one fetch at
/// a time: the next tick is scheduled only after the previous response has
/// been processed, so events are observed strictly in request order.
///
/// A transport failure on a tick is not a state transition — it is logged
/// and the poller retries on the next tick. Only an explicit `failed`
/// status from a successful response terminates the session as a failure.
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use coach_common::api::{AnalysisApi, JobStatus, ProgressSnapshot};

/// How long to wait between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
/// Pause between observing `completed` and notifying the consumer, so the
/// final progress update can render before the view transitions.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1000);

const DEFAULT_FAILURE_MESSAGE: &str = "Analysis failed. Please try again.";

#[derive(Clone, Copy, Debug)]
pub struct PollerConfig {
    pub poll_interval: Duration,
    pub settle_delay: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// Lifecycle of a poll session. `Completed`, `Failed` and `Cancelled` are
/// absorbing: the loop exits on reaching them and releases its timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
    Completed,
    Failed,
    Cancelled,
}

impl PollState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Live view of one poll session, published through a watch channel.
#[derive(Clone, Debug)]
pub struct PollSession {
    pub state: PollState,
    pub last_snapshot: Option<ProgressSnapshot>,
}

/// Events delivered to the consumer, in the order snapshots resolved.
/// Exactly one of `Completed` / `Failed` is emitted per session, after
/// which the channel closes; a cancelled session closes it without a
/// terminal event.
#[derive(Clone, Debug, PartialEq)]
pub enum PollEvent {
    Progress(ProgressSnapshot),
    Completed,
    Failed { message: String },
}

/// Owner's handle to a running poll session.
///
/// Cancellation is an explicit call, but dropping the handle also cancels
/// so an abandoned session cannot keep its timer alive.
pub struct PollHandle {
    cancel: CancellationToken,
    session: watch::Receiver<PollSession>,
    _task: JoinHandle<()>,
}

impl PollHandle {
    /// Stop polling. Any in-flight fetch is discarded; no further events
    /// are delivered.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Snapshot of the session's current state.
    pub fn session(&self) -> PollSession {
        self.session.borrow().clone()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Start polling `job_id`. Returns the owner handle and the event stream.
pub fn spawn<A: AnalysisApi>(
    api: Arc<A>,
    job_id: impl Into<String>,
    config: PollerConfig,
) -> (PollHandle, mpsc::UnboundedReceiver<PollEvent>) {
    let job_id = job_id.into();
    let cancel = CancellationToken::new();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (session_tx, session_rx) = watch::channel(PollSession {
        state: PollState::Idle,
        last_snapshot: None,
    });

    let task = tokio::spawn(run_loop(
        api,
        job_id,
        config,
        cancel.clone(),
        event_tx,
        session_tx,
    ));

    (
        PollHandle {
            cancel,
            session: session_rx,
            _task: task,
        },
        event_rx,
    )
}

async fn run_loop<A: AnalysisApi>(
    api: Arc<A>,
    job_id: String,
    config: PollerConfig,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<PollEvent>,
    session: watch::Sender<PollSession>,
) {
    info!(job_id = %job_id, "progress polling started");
    let mut last_snapshot: Option<ProgressSnapshot> = None;
    session.send_replace(PollSession {
        state: PollState::Polling,
        last_snapshot: None,
    });

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                finish(&session, PollState::Cancelled, &last_snapshot, &job_id);
                return;
            }
            _ = tokio::time::sleep(config.poll_interval) => {}
        }

        let snapshot = tokio::select! {
            // Dropping the fetch future here discards its eventual result.
            _ = cancel.cancelled() => {
                finish(&session, PollState::Cancelled, &last_snapshot, &job_id);
                return;
            }
            result = api.job_status(&job_id) => match result {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "status check failed, retrying next tick");
                    continue;
                }
            }
        };

        last_snapshot = Some(snapshot.clone());
        session.send_replace(PollSession {
            state: PollState::Polling,
            last_snapshot: last_snapshot.clone(),
        });
        let _ = events.send(PollEvent::Progress(snapshot.clone()));

        match snapshot.status {
            JobStatus::Pending | JobStatus::Processing => {}
            JobStatus::Completed => {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        finish(&session, PollState::Cancelled, &last_snapshot, &job_id);
                        return;
                    }
                    _ = tokio::time::sleep(config.settle_delay) => {}
                }
                finish(&session, PollState::Completed, &last_snapshot, &job_id);
                let _ = events.send(PollEvent::Completed);
                return;
            }
            JobStatus::Failed => {
                let message = snapshot
                    .error
                    .clone()
                    .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
                finish(&session, PollState::Failed, &last_snapshot, &job_id);
                warn!(job_id = %job_id, message = %message, "analysis failed");
                let _ = events.send(PollEvent::Failed { message });
                return;
            }
        }
    }
}

fn finish(
    session: &watch::Sender<PollSession>,
    state: PollState,
    last_snapshot: &Option<ProgressSnapshot>,
    job_id: &str,
) {
    session.send_replace(PollSession {
        state,
        last_snapshot: last_snapshot.clone(),
    });
    info!(job_id = %job_id, state = ?state, "progress polling finished");
}
