//! Polling of long-running server jobs until they reach a terminal status.
//!
//! # Design
//! - One poll task per submitted job; the task owns its timer and stops
//!   itself at the first terminal observation or query failure.
//! - Queries never overlap: each tick awaits its query before the next tick
//!   is taken, and missed ticks are delayed rather than burst.
//! - A terminal observation produces exactly one outcome notification and one
//!   view refresh. A failed query only logs and stops.
//! - [`PollHandle::cancel`] is idempotent and also stops the task between ticks
//!   or mid-query.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use resticly_api_models::{Backup, BackupStatus};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::core::notify::{NotificationCenter, Severity};
use crate::core::refresh::ViewRefresher;
use crate::error::{ClientError, ClientResult};
use crate::i18n::TranslationBundle;

/// Default delay between status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Coarse lifecycle of a tracked job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobPhase {
    /// Still queued or running; keep polling.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully, or ended in a state this client cannot name.
    Failed,
}

impl JobPhase {
    /// Whether polling should stop.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// A server resource whose status can be polled.
pub trait TrackedJob {
    /// Translation section for outcome messages (`jobs.<KIND>.completed`).
    const KIND: &'static str;
    /// English label used when no translation exists.
    const LABEL: &'static str;

    /// Server identifier of the job.
    fn job_id(&self) -> i64;

    /// Current phase derived from the server status.
    fn phase(&self) -> JobPhase;

    /// Extra detail appended to a failure notification.
    fn failure_detail(&self) -> Option<&str> {
        None
    }
}

impl TrackedJob for Backup {
    const KIND: &'static str = "backup";
    const LABEL: &'static str = "Backup";

    fn job_id(&self) -> i64 {
        self.id
    }

    fn phase(&self) -> JobPhase {
        match self.status {
            BackupStatus::Pending | BackupStatus::Running => JobPhase::Running,
            BackupStatus::Completed => JobPhase::Completed,
            BackupStatus::Failed | BackupStatus::Unknown => JobPhase::Failed,
        }
    }

    fn failure_detail(&self) -> Option<&str> {
        self.message.as_deref().filter(|message| !message.trim().is_empty())
    }
}

/// Fetches the current state of a job.
#[async_trait]
pub trait JobProbe: Send + Sync + 'static {
    /// Job type returned by the status endpoint.
    type Job: TrackedJob + Send + 'static;

    /// Query the job's current state.
    async fn probe(&self, id: i64) -> ClientResult<Self::Job>;
}

/// Observable poller state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollState {
    /// No job submitted yet.
    Idle,
    /// The job was accepted; the first query is pending.
    Submitted {
        /// Server job id.
        job_id: i64,
    },
    /// At least one non-terminal observation was made.
    Polling {
        /// Server job id.
        job_id: i64,
        /// Queries issued so far.
        queries: u32,
    },
    /// The job finished successfully.
    Completed {
        /// Server job id.
        job_id: i64,
    },
    /// The job finished unsuccessfully.
    Failed {
        /// Server job id.
        job_id: i64,
    },
    /// A status query failed and polling stopped without an outcome.
    Aborted {
        /// Server job id.
        job_id: i64,
    },
    /// Polling was cancelled by the owner.
    Cancelled {
        /// Server job id.
        job_id: i64,
    },
}

impl PollState {
    /// Whether the poll task has stopped.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Failed { .. } | Self::Aborted { .. } | Self::Cancelled { .. }
        )
    }
}

/// How a poll task ended.
#[derive(Debug)]
pub enum PollOutcome<J> {
    /// Terminal success; carries the final observation.
    Completed(J),
    /// Terminal failure; carries the final observation.
    Failed(J),
    /// A status query failed.
    Aborted(ClientError),
    /// The handle was cancelled first.
    Cancelled,
}

/// Spawns poll tasks that share one probe, timer interval and outcome sinks.
pub struct JobPoller<P: JobProbe> {
    probe: Arc<P>,
    interval: Duration,
    notifications: NotificationCenter,
    refresher: ViewRefresher,
    bundle: Arc<TranslationBundle>,
    parent: CancellationToken,
}

impl<P: JobProbe> JobPoller<P> {
    /// Build a poller that notifies through `notifications` and refreshes `refresher`.
    #[must_use]
    pub fn new(
        probe: P,
        interval: Duration,
        notifications: NotificationCenter,
        refresher: ViewRefresher,
        bundle: Arc<TranslationBundle>,
    ) -> Self {
        Self {
            probe: Arc::new(probe),
            interval,
            notifications,
            refresher,
            bundle,
            parent: CancellationToken::new(),
        }
    }

    /// Tie every spawned task to `parent`, so cancelling it stops them all.
    #[must_use]
    pub fn with_parent(mut self, parent: CancellationToken) -> Self {
        self.parent = parent;
        self
    }

    /// Await a creation call and start polling the job it returns.
    ///
    /// # Errors
    ///
    /// Returns the creation error; nothing is polled in that case.
    pub async fn submit<F>(&self, create: F) -> ClientResult<PollHandle<P::Job>>
    where
        F: Future<Output = ClientResult<P::Job>>,
    {
        let job = create.await?;
        Ok(self.track(job.job_id()))
    }

    /// Start polling an already submitted job.
    #[must_use]
    pub fn track(&self, job_id: i64) -> PollHandle<P::Job> {
        let token = self.parent.child_token();
        let (state_tx, state_rx) = watch::channel(PollState::Submitted { job_id });
        let run = PollRun {
            job_id,
            probe: Arc::clone(&self.probe),
            interval: self.interval,
            notifications: self.notifications.clone(),
            refresher: self.refresher.clone(),
            bundle: Arc::clone(&self.bundle),
            token: token.clone(),
            state: state_tx,
        };
        info!(job_id, kind = <P::Job as TrackedJob>::KIND, "polling job status");
        PollHandle {
            job_id,
            token,
            state: state_rx,
            task: tokio::spawn(run.run()),
        }
    }
}

struct PollRun<P: JobProbe> {
    job_id: i64,
    probe: Arc<P>,
    interval: Duration,
    notifications: NotificationCenter,
    refresher: ViewRefresher,
    bundle: Arc<TranslationBundle>,
    token: CancellationToken,
    state: watch::Sender<PollState>,
}

impl<P: JobProbe> PollRun<P> {
    async fn run(self) -> PollOutcome<P::Job> {
        let job_id = self.job_id;
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut queries = 0_u32;

        loop {
            tokio::select! {
                biased;
                () = self.token.cancelled() => return self.cancelled(),
                _ = ticker.tick() => {}
            }

            queries = queries.saturating_add(1);
            let observed = tokio::select! {
                biased;
                () = self.token.cancelled() => return self.cancelled(),
                observed = self.probe.probe(job_id) => observed,
            };

            match observed {
                Ok(job) => match job.phase() {
                    JobPhase::Running => {
                        self.state.send_replace(PollState::Polling { job_id, queries });
                    }
                    JobPhase::Completed => {
                        self.token.cancel();
                        self.state.send_replace(PollState::Completed { job_id });
                        self.announce(&job, Severity::Success);
                        self.refresher.refresh().await;
                        return PollOutcome::Completed(job);
                    }
                    JobPhase::Failed => {
                        self.token.cancel();
                        self.state.send_replace(PollState::Failed { job_id });
                        self.announce(&job, Severity::Danger);
                        self.refresher.refresh().await;
                        return PollOutcome::Failed(job);
                    }
                },
                Err(err) => {
                    self.token.cancel();
                    error!(job_id, queries, error = %err, "job status query failed; polling stopped");
                    self.state.send_replace(PollState::Aborted { job_id });
                    return PollOutcome::Aborted(err);
                }
            }
        }
    }

    fn cancelled(&self) -> PollOutcome<P::Job> {
        info!(job_id = self.job_id, "job polling cancelled");
        self.state.send_replace(PollState::Cancelled {
            job_id: self.job_id,
        });
        PollOutcome::Cancelled
    }

    fn announce(&self, job: &P::Job, severity: Severity) {
        let kind = <P::Job as TrackedJob>::KIND;
        let label = <P::Job as TrackedJob>::LABEL;
        let message = if severity == Severity::Success {
            self.bundle
                .text(&format!("jobs.{kind}.completed"), &format!("{label} completed"))
        } else {
            let summary = self
                .bundle
                .text(&format!("jobs.{kind}.failed"), &format!("{label} failed"));
            match job.failure_detail() {
                Some(detail) => format!("{summary}: {detail}"),
                None => summary,
            }
        };
        info!(job_id = self.job_id, severity = severity.as_str(), "job reached terminal status");
        self.notifications.notify(message, severity);
    }
}

/// Owner-side handle of one poll task.
#[derive(Debug)]
pub struct PollHandle<J> {
    job_id: i64,
    token: CancellationToken,
    state: watch::Receiver<PollState>,
    task: JoinHandle<PollOutcome<J>>,
}

impl<J> PollHandle<J> {
    /// Server id of the polled job.
    #[must_use]
    pub const fn job_id(&self) -> i64 {
        self.job_id
    }

    /// Stop polling. Calling this more than once has no further effect.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether polling has been stopped, by the owner or by the task itself.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Latest observed state.
    #[must_use]
    pub fn state(&self) -> PollState {
        self.state.borrow().clone()
    }

    /// Observe state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.clone()
    }

    /// Wait for the poll task to finish.
    pub async fn wait(self) -> PollOutcome<J> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(job_id = self.job_id, error = %err, "poll task ended abnormally");
                PollOutcome::Cancelled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::refresh::RefreshView;
    use crate::error::FailureKind;
    use crate::i18n::LocaleCode;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct FakeJob {
        id: i64,
        status: BackupStatus,
    }

    impl TrackedJob for FakeJob {
        const KIND: &'static str = "backup";
        const LABEL: &'static str = "Backup";

        fn job_id(&self) -> i64 {
            self.id
        }

        fn phase(&self) -> JobPhase {
            match self.status {
                BackupStatus::Pending | BackupStatus::Running => JobPhase::Running,
                BackupStatus::Completed => JobPhase::Completed,
                BackupStatus::Failed | BackupStatus::Unknown => JobPhase::Failed,
            }
        }
    }

    struct ScriptedProbe {
        script: Mutex<VecDeque<ClientResult<BackupStatus>>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        queries: Arc<AtomicUsize>,
        latency: Duration,
    }

    impl ScriptedProbe {
        fn new(script: Vec<ClientResult<BackupStatus>>, latency: Duration) -> (Self, Arc<AtomicUsize>) {
            let queries = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    script: Mutex::new(script.into()),
                    in_flight: AtomicUsize::new(0),
                    max_in_flight: AtomicUsize::new(0),
                    queries: Arc::clone(&queries),
                    latency,
                },
                queries,
            )
        }
    }

    #[async_trait]
    impl JobProbe for ScriptedProbe {
        type Job = FakeJob;

        async fn probe(&self, id: i64) -> ClientResult<FakeJob> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            assert_eq!(self.max_in_flight.load(Ordering::SeqCst), 1);
            let next = self
                .script
                .lock()
                .ok()
                .and_then(|mut script| script.pop_front())
                .unwrap_or(Ok(BackupStatus::Running));
            next.map(|status| FakeJob { id, status })
        }
    }

    struct CountingView(Arc<AtomicUsize>);

    #[async_trait]
    impl RefreshView for CountingView {
        fn name(&self) -> &str {
            "backups"
        }

        async fn refresh(&self) -> ClientResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Harness {
        notifications: NotificationCenter,
        refreshes: Arc<AtomicUsize>,
        refresher: ViewRefresher,
    }

    fn harness() -> Harness {
        let refreshes = Arc::new(AtomicUsize::new(0));
        let refresher = ViewRefresher::default();
        refresher.mount(Arc::new(CountingView(Arc::clone(&refreshes))));
        Harness {
            notifications: NotificationCenter::new(Duration::from_secs(60)),
            refreshes,
            refresher,
        }
    }

    fn poller(probe: ScriptedProbe, harness: &Harness) -> JobPoller<ScriptedProbe> {
        JobPoller::new(
            probe,
            Duration::from_millis(10),
            harness.notifications.clone(),
            harness.refresher.clone(),
            Arc::new(TranslationBundle::new(LocaleCode::En)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn running_then_completed_notifies_once() {
        let harness = harness();
        let (probe, queries) = ScriptedProbe::new(
            vec![
                Ok(BackupStatus::Running),
                Ok(BackupStatus::Running),
                Ok(BackupStatus::Completed),
            ],
            Duration::from_millis(1),
        );
        let handle = poller(probe, &harness).track(7);
        assert_eq!(handle.state(), PollState::Submitted { job_id: 7 });
        let token_view = handle.token.clone();

        let outcome = handle.wait().await;
        assert!(matches!(outcome, PollOutcome::Completed(FakeJob { id: 7, .. })));
        assert_eq!(queries.load(Ordering::SeqCst), 3);
        assert!(token_view.is_cancelled());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(queries.load(Ordering::SeqCst), 3);

        let shown = harness.notifications.active();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].message, "Backup completed");
        assert_eq!(shown[0].severity, Severity::Success);
        assert_eq!(harness.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_job_uses_danger_severity() {
        let harness = harness();
        let (probe, _) = ScriptedProbe::new(vec![Ok(BackupStatus::Failed)], Duration::ZERO);
        let outcome = poller(probe, &harness).track(3).wait().await;
        assert!(matches!(outcome, PollOutcome::Failed(_)));
        let shown = harness.notifications.active();
        assert_eq!(shown.len(), 1);
        assert!(shown[0].message.contains("failed"));
        assert_eq!(shown[0].severity, Severity::Danger);
        assert_eq!(harness.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_status_is_terminal_failure() {
        let harness = harness();
        let (probe, queries) = ScriptedProbe::new(
            vec![Ok(BackupStatus::Pending), Ok(BackupStatus::Unknown)],
            Duration::ZERO,
        );
        let outcome = poller(probe, &harness).track(5).wait().await;
        assert!(matches!(outcome, PollOutcome::Failed(_)));
        assert_eq!(queries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn query_error_stops_without_outcome_notification() {
        let harness = harness();
        let (probe, queries) = ScriptedProbe::new(
            vec![
                Ok(BackupStatus::Running),
                Err(ClientError::request_failed(
                    FailureKind::Protocol { status: 404 },
                    "Backup not found",
                )),
            ],
            Duration::ZERO,
        );
        let handle = poller(probe, &harness).track(9);
        let mut states = handle.subscribe();
        let outcome = handle.wait().await;

        assert!(matches!(outcome, PollOutcome::Aborted(_)));
        assert_eq!(*states.borrow_and_update(), PollState::Aborted { job_id: 9 });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(queries.load(Ordering::SeqCst), 2);
        assert!(harness.notifications.active().is_empty());
        assert_eq!(harness.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_queries_never_overlap() {
        let harness = harness();
        let (probe, queries) = ScriptedProbe::new(
            vec![
                Ok(BackupStatus::Running),
                Ok(BackupStatus::Running),
                Ok(BackupStatus::Completed),
            ],
            Duration::from_millis(35),
        );
        let outcome = poller(probe, &harness).track(1).wait().await;
        assert!(matches!(outcome, PollOutcome::Completed(_)));
        assert_eq!(queries.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_idempotent_and_stops_queries() {
        let harness = harness();
        let (probe, queries) = ScriptedProbe::new(Vec::new(), Duration::ZERO);
        let handle = poller(probe, &harness).track(2);

        tokio::time::sleep(Duration::from_millis(25)).await;
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
        let seen = queries.load(Ordering::SeqCst);

        let outcome = handle.wait().await;
        assert!(matches!(outcome, PollOutcome::Cancelled));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(queries.load(Ordering::SeqCst), seen);
        assert!(harness.notifications.active().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn parent_cancellation_stops_children() {
        let harness = harness();
        let parent = CancellationToken::new();
        let (probe, _) = ScriptedProbe::new(Vec::new(), Duration::ZERO);
        let poller = poller(probe, &harness).with_parent(parent.clone());
        let first = poller.track(1);
        let second = poller.track(2);

        parent.cancel();
        assert!(matches!(first.wait().await, PollOutcome::Cancelled));
        assert!(matches!(second.wait().await, PollOutcome::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn submit_propagates_creation_errors() {
        let harness = harness();
        let (probe, queries) = ScriptedProbe::new(Vec::new(), Duration::ZERO);
        let poller = poller(probe, &harness);
        let result = poller
            .submit(async {
                Err::<FakeJob, _>(ClientError::request_failed(
                    FailureKind::Protocol { status: 400 },
                    "Missing required field: source_path",
                ))
            })
            .await;
        assert!(result.is_err());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(queries.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn backup_phases_follow_status() {
        let mut backup = Backup {
            id: 1,
            repository_id: 1,
            repository_name: None,
            source_path: "/srv".into(),
            start_time: None,
            end_time: None,
            status: BackupStatus::Pending,
            message: Some("  ".into()),
            files_new: 0,
            files_changed: 0,
            bytes_added: 0,
            snapshot_id: None,
        };
        assert_eq!(backup.phase(), JobPhase::Running);
        assert!(backup.failure_detail().is_none());
        backup.status = BackupStatus::Completed;
        assert!(backup.phase().is_terminal());
        backup.status = BackupStatus::Unknown;
        assert_eq!(backup.phase(), JobPhase::Failed);
    }
}
