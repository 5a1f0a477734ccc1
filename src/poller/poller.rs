//! The per-job poller.

use crate::backends::TimeoutBackend;
use crate::core::{
    ArcBackend, ArcNotifier, ArcReportTrigger, LifecycleStatus, PollerError, ScanJob,
    ScannerResult, VendorStatus,
};
use crate::poller::config::{validate_interval, PollerConfig};
use crate::status::{
    map_status, Mapping, ReconciliationState, Reconciler, RelaunchPolicy, Relauncher, Transition,
};

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Collaborators shared by all pollers of a registry.
#[derive(Debug, Clone)]
pub struct PollerContext {
    backend: ArcBackend,
    reconciler: Reconciler,
    target: String,
    relaunch: RelaunchPolicy,
}

impl PollerContext {
    /// Wires the collaborators together.
    ///
    /// The backend is wrapped in a [`TimeoutBackend`] when the configuration
    /// sets a request timeout.
    pub fn new(
        backend: ArcBackend,
        notifier: ArcNotifier,
        report: ArcReportTrigger,
        config: &PollerConfig,
    ) -> Self {
        let backend: ArcBackend = match config.request_timeout {
            Some(timeout) => Arc::new(TimeoutBackend::new(backend, timeout)),
            None => backend,
        };
        let relauncher = Relauncher::new(
            Arc::clone(&backend),
            Arc::clone(&notifier),
            config.target.clone(),
            config.relaunch.clone(),
        );
        Self {
            backend,
            reconciler: Reconciler::new(notifier, report, relauncher),
            target: config.target.clone(),
            relaunch: config.relaunch.clone(),
        }
    }

    /// Returns the relaunch policy.
    pub fn relaunch_policy(&self) -> &RelaunchPolicy {
        &self.relaunch
    }
}

/// The outcome of a single poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The vendor status has not changed since the previous cycle.
    Unchanged,
    /// The job is still in progress.
    Continued(LifecycleStatus),
    /// The job reached a terminal status; the poller is now inactive.
    Terminated(LifecycleStatus),
    /// The scan was relaunched; the successor job must be polled instead.
    Relaunched(ScanJob),
    /// The poller was already inactive; nothing was done.
    Inactive,
}

impl From<Transition> for CycleOutcome {
    fn from(transition: Transition) -> Self {
        match transition {
            Transition::Continue(status) => Self::Continued(status),
            Transition::Terminated(status) => Self::Terminated(status),
            Transition::Relaunched(job) => Self::Relaunched(job),
        }
    }
}

/// Why [`Poller::run`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerExit {
    /// The job reached a terminal status.
    Terminated(LifecycleStatus),
    /// The scan was relaunched as the given successor job.
    Relaunched(ScanJob),
    /// The poller was cancelled between cycles.
    Cancelled,
}

/// Polls one scan and reconciles its status.
///
/// The poller owns the job's [`ReconciliationState`]. Cycles run one after
/// another on a single task, so the state needs no locking.
#[derive(Debug)]
pub struct Poller {
    job: ScanJob,
    scan_id: String,
    backend: ArcBackend,
    reconciler: Reconciler,
    target: String,
    state: ReconciliationState,
    initial_delay: Duration,
    poll_interval: Duration,
    active: bool,
}

impl Poller {
    /// Creates a poller for a job that has been accepted by the backend.
    pub fn new(
        job: ScanJob,
        context: &PollerContext,
        initial_delay: Duration,
        poll_interval: Duration,
    ) -> Result<Self, PollerError> {
        validate_interval(poll_interval)?;
        let scan_id = job.require_scan_id()?.to_string();

        Ok(Self {
            job,
            scan_id,
            backend: Arc::clone(&context.backend),
            reconciler: context.reconciler.clone(),
            target: context.target.clone(),
            state: ReconciliationState::new(),
            initial_delay,
            poll_interval,
            active: true,
        })
    }

    /// Returns the job being polled.
    pub fn job(&self) -> &ScanJob {
        &self.job
    }

    /// Returns the job's reconciliation state.
    pub fn state(&self) -> &ReconciliationState {
        &self.state
    }

    /// Returns `true` until the job terminates or is relaunched.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Runs exactly one poll cycle.
    ///
    /// Once the poller is inactive this returns [`CycleOutcome::Inactive`]
    /// without contacting the backend.
    pub async fn poll_once(&mut self) -> CycleOutcome {
        if !self.active {
            return CycleOutcome::Inactive;
        }

        tracing::debug!(
            job_id = %self.job.job_id,
            scanner_scan_id = %self.scan_id,
            "Checking scan status"
        );

        let transition = match self.check().await {
            Ok(None) => return CycleOutcome::Unchanged,
            Ok(Some(mapping)) => {
                self.reconciler
                    .reconcile(&self.job, &mut self.state, mapping)
                    .await
            }
            Err(e) => {
                self.reconciler
                    .retrieval_failed(&self.job, &mut self.state, &e)
                    .await
            }
        };

        if transition.stops_polling() {
            self.active = false;
        }
        transition.into()
    }

    /// Polls on a fixed delay until the job terminates, is relaunched, or
    /// `cancel` fires.
    ///
    /// Cancellation is observed only between cycles; a cycle in flight
    /// always runs to completion.
    pub async fn run(mut self, cancel: CancellationToken) -> PollerExit {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollerExit::Cancelled,
            _ = tokio::time::sleep(self.initial_delay) => {}
        }

        loop {
            match self.poll_once().await {
                CycleOutcome::Terminated(status) => return PollerExit::Terminated(status),
                CycleOutcome::Relaunched(next) => return PollerExit::Relaunched(next),
                CycleOutcome::Inactive => {
                    return PollerExit::Terminated(self.state.current_status());
                }
                CycleOutcome::Unchanged | CycleOutcome::Continued(_) => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollerExit::Cancelled,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    async fn check(&mut self) -> ScannerResult<Option<Mapping>> {
        let raw = self
            .backend
            .retrieve_scan_status(&self.target, &self.scan_id)
            .await?;
        let vendor: VendorStatus = raw.parse()?;

        if !self.state.observe(vendor) {
            tracing::debug!(
                job_id = %self.job.job_id,
                vendor_status = %vendor,
                "Vendor status unchanged"
            );
            return Ok(None);
        }

        map_status(self.backend.as_ref(), &self.target, &self.scan_id, vendor)
            .await
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockBackend;
    use crate::callback::RecordingNotifier;
    use crate::core::{LogType, ScanConfig};
    use crate::report::RecordingReportTrigger;

    struct Fixture {
        backend: Arc<MockBackend>,
        notifier: Arc<RecordingNotifier>,
        report: Arc<RecordingReportTrigger>,
        context: PollerContext,
    }

    fn fixture(backend: MockBackend) -> Fixture {
        let backend = Arc::new(backend);
        let notifier = Arc::new(RecordingNotifier::new());
        let report = Arc::new(RecordingReportTrigger::new());
        let config = PollerConfig::new("host").with_request_timeout(None);
        let context = PollerContext::new(backend.clone(), notifier.clone(), report.clone(), &config);
        Fixture {
            backend,
            notifier,
            report,
            context,
        }
    }

    fn job() -> ScanJob {
        ScanJob::new("job-1", "app-1", ScanConfig::new("https://example.com", "p1"))
            .with_scanner_scan_id("100")
    }

    fn poller(f: &Fixture) -> Poller {
        Poller::new(job(), &f.context, Duration::ZERO, Duration::from_secs(1)).unwrap()
    }

    #[tokio::test]
    async fn test_first_observation_is_reconciled() {
        let f = fixture(MockBackend::new().with_statuses(["SUBMITTED"]));
        let mut poller = poller(&f);

        assert_eq!(
            poller.poll_once().await,
            CycleOutcome::Continued(LifecycleStatus::Running)
        );
        let updates = f.notifier.status_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].status, LifecycleStatus::Running);
        assert_eq!(updates[0].scanner_scan_id.as_deref(), Some("100"));
    }

    #[tokio::test]
    async fn test_unchanged_status_is_skipped() {
        let f = fixture(MockBackend::new().with_statuses(["RUNNING"]));
        let mut poller = poller(&f);

        poller.poll_once().await;
        assert_eq!(poller.poll_once().await, CycleOutcome::Unchanged);
        assert_eq!(poller.poll_once().await, CycleOutcome::Unchanged);

        assert_eq!(f.backend.status_calls(), 3);
        assert_eq!(f.notifier.status_updates().len(), 1);
        assert_eq!(f.notifier.logs().len(), 1);
    }

    #[tokio::test]
    async fn test_submitted_then_running_changes_raw_status() {
        // Both map to RUNNING, but the raw status changed, so both are reconciled.
        let f = fixture(MockBackend::new().with_statuses(["SUBMITTED", "RUNNING"]));
        let mut poller = poller(&f);

        poller.poll_once().await;
        poller.poll_once().await;
        assert_eq!(f.notifier.status_updates().len(), 2);
    }

    #[tokio::test]
    async fn test_no_backend_calls_after_terminal_status() {
        let f = fixture(MockBackend::new().with_statuses(["FINISHED"]));
        let mut poller = poller(&f);

        assert_eq!(
            poller.poll_once().await,
            CycleOutcome::Terminated(LifecycleStatus::Completed)
        );
        assert!(!poller.is_active());
        assert_eq!(poller.state().current_status(), LifecycleStatus::Completed);

        assert_eq!(poller.poll_once().await, CycleOutcome::Inactive);
        assert_eq!(f.backend.status_calls(), 1);
        assert_eq!(f.report.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_status_failure_stops_polling() {
        let f = fixture(MockBackend::new().with_status_failure());
        let mut poller = poller(&f);

        assert_eq!(
            poller.poll_once().await,
            CycleOutcome::Terminated(LifecycleStatus::Error)
        );
        assert_eq!(f.notifier.status_updates().len(), 1);
        assert_eq!(f.notifier.logs_with(LogType::Error).len(), 1);
        assert_eq!(poller.poll_once().await, CycleOutcome::Inactive);
        assert_eq!(f.backend.status_calls(), 1);
    }

    #[tokio::test]
    async fn test_unrecognized_status_is_an_error() {
        let f = fixture(MockBackend::new().with_statuses(["PROCESSING"]));
        let mut poller = poller(&f);

        assert_eq!(
            poller.poll_once().await,
            CycleOutcome::Terminated(LifecycleStatus::Error)
        );
    }

    #[tokio::test]
    async fn test_top_level_relaunch_causes() {
        for raw in ["TIME_LIMIT_EXCEEDED", "SCANNER_NOT_AVAILABLE"] {
            let f = fixture(MockBackend::new().with_statuses([raw]));
            let mut poller = poller(&f);

            let next = match poller.poll_once().await {
                CycleOutcome::Relaunched(next) => next,
                other => panic!("unexpected outcome {other:?}"),
            };
            assert_eq!(next.job_id, "job-1");
            assert!(!poller.is_active());
            assert!(f.notifier.status_updates().is_empty());
            assert_eq!(f.backend.launch_calls(), 1);
        }
    }

    #[tokio::test]
    async fn test_sub_status_failure_stops_polling() {
        let f = fixture(
            MockBackend::new()
                .with_statuses(["FINISHED"])
                .with_sub_status_failure(),
        );
        let mut poller = poller(&f);

        assert_eq!(
            poller.poll_once().await,
            CycleOutcome::Terminated(LifecycleStatus::Error)
        );
        assert!(!poller.is_active());

        let updates = f.notifier.status_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].status, LifecycleStatus::Error);
        let errors = f.notifier.logs_with(LogType::Error);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Could not retrieve the status");

        // Authentication failed first, so results were never fetched.
        assert_eq!(f.backend.auth_calls(), 1);
        assert_eq!(f.backend.result_calls(), 0);
        assert!(f.report.calls().is_empty());

        assert_eq!(poller.poll_once().await, CycleOutcome::Inactive);
        assert_eq!(f.backend.status_calls(), 1);
    }

    #[tokio::test]
    async fn test_finished_with_result_time_limit_relaunches() {
        let f = fixture(
            MockBackend::new()
                .with_statuses(["FINISHED"])
                .with_auth_status("PARTIAL")
                .with_result_status("TIME_LIMIT_EXCEEDED"),
        );
        let mut poller = poller(&f);

        let next = match poller.poll_once().await {
            CycleOutcome::Relaunched(next) => next,
            other => panic!("unexpected outcome {other:?}"),
        };
        assert_eq!(next.scanner_scan_id.as_deref(), Some("1000"));
        assert_eq!(next.relaunch_count, 1);
        assert!(!poller.is_active());

        assert!(f.notifier.status_updates().is_empty());
        assert!(f.notifier.logs_with(LogType::Error).is_empty());
        assert!(f.report.calls().is_empty());
        assert_eq!(f.backend.launch_calls(), 1);

        assert_eq!(poller.poll_once().await, CycleOutcome::Inactive);
        assert_eq!(f.backend.status_calls(), 1);
    }

    #[tokio::test]
    async fn test_finished_with_partial_auth_fails() {
        let f = fixture(
            MockBackend::new()
                .with_statuses(["RUNNING", "FINISHED"])
                .with_auth_status("PARTIAL"),
        );
        let mut poller = poller(&f);

        poller.poll_once().await;
        assert_eq!(
            poller.poll_once().await,
            CycleOutcome::Terminated(LifecycleStatus::Failed)
        );
        assert!(f.report.calls().is_empty());

        let statuses: Vec<LifecycleStatus> = f
            .notifier
            .status_updates()
            .iter()
            .map(|u| u.status)
            .collect();
        assert_eq!(statuses, vec![LifecycleStatus::Running, LifecycleStatus::Failed]);

        assert_eq!(poller.poll_once().await, CycleOutcome::Inactive);
        assert_eq!(poller.poll_once().await, CycleOutcome::Inactive);
        assert_eq!(f.backend.status_calls(), 2);
    }

    #[tokio::test]
    async fn test_no_backend_calls_after_cancel() {
        let f = fixture(MockBackend::new().with_statuses(["CANCELED"]));
        let mut poller = poller(&f);

        assert_eq!(
            poller.poll_once().await,
            CycleOutcome::Terminated(LifecycleStatus::Canceled)
        );
        assert_eq!(poller.poll_once().await, CycleOutcome::Inactive);
        assert_eq!(f.backend.status_calls(), 1);
        assert_eq!(
            f.notifier.logs_with(LogType::Error)[0].message,
            "Scan is cancelled"
        );
    }

    #[tokio::test]
    async fn test_failing_notifier_still_terminates() {
        let backend = Arc::new(MockBackend::new().with_statuses(["RUNNING", "ERROR"]));
        let notifier = Arc::new(RecordingNotifier::failing());
        let config = PollerConfig::new("host").with_request_timeout(None);
        let context = PollerContext::new(
            backend.clone(),
            notifier.clone(),
            Arc::new(RecordingReportTrigger::new()),
            &config,
        );
        let mut poller =
            Poller::new(job(), &context, Duration::ZERO, Duration::from_secs(1)).unwrap();

        assert_eq!(
            poller.poll_once().await,
            CycleOutcome::Continued(LifecycleStatus::Running)
        );
        assert_eq!(
            poller.poll_once().await,
            CycleOutcome::Terminated(LifecycleStatus::Error)
        );
        assert_eq!(poller.poll_once().await, CycleOutcome::Inactive);

        assert_eq!(notifier.status_updates().len(), 2);
        assert_eq!(backend.status_calls(), 2);
    }

    #[tokio::test]
    async fn test_missing_scan_id_rejected() {
        let f = fixture(MockBackend::new());
        let pending = ScanJob::new("job-2", "app-1", ScanConfig::new("https://example.com", "p1"));

        let result = Poller::new(pending, &f.context, Duration::ZERO, Duration::from_secs(1));
        assert!(matches!(result, Err(PollerError::MissingScanId { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_completed() {
        let f = fixture(
            MockBackend::new().with_statuses(["SUBMITTED", "RUNNING", "RUNNING", "FINISHED"]),
        );
        let poller = poller(&f);

        let exit = poller.run(CancellationToken::new()).await;

        assert_eq!(exit, PollerExit::Terminated(LifecycleStatus::Completed));
        assert_eq!(f.backend.status_calls(), 4);
        let statuses: Vec<LifecycleStatus> = f
            .notifier
            .status_updates()
            .iter()
            .map(|u| u.status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                LifecycleStatus::Running,
                LifecycleStatus::Running,
                LifecycleStatus::Completed
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_cancelled_before_first_cycle() {
        let f = fixture(MockBackend::new());
        let poller =
            Poller::new(job(), &f.context, Duration::from_secs(60), Duration::from_secs(1))
                .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(poller.run(cancel).await, PollerExit::Cancelled);
        assert_eq!(f.backend.status_calls(), 0);
    }
}
