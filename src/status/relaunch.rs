//! Relaunch policy and the relaunch action.

use crate::core::{ArcBackend, ArcNotifier, LifecycleStatus, LogEntry, ScanJob, StatusUpdate};
use crate::status::mapper::RelaunchCause;
use crate::status::{persist_log, push_status};

use std::time::Duration;

/// Limits and backoff for automatic relaunches.
///
/// The delay for a relaunch is added to the initial delay of the poller that
/// watches the re-submitted scan.
#[derive(Debug, Clone)]
pub struct RelaunchPolicy {
    /// Maximum number of relaunches for one job.
    pub max_relaunches: u32,

    /// Delay before polling the first relaunched scan.
    pub initial_delay: Duration,

    /// Maximum delay between relaunches.
    pub max_delay: Duration,

    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,

    /// Whether to add jitter to delays.
    pub jitter: bool,
}

impl Default for RelaunchPolicy {
    fn default() -> Self {
        Self {
            max_relaunches: 5,
            initial_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(30 * 60),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }
}

impl RelaunchPolicy {
    /// Creates a new policy with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Disables relaunching; recoverable outcomes become errors.
    pub fn never() -> Self {
        Self {
            max_relaunches: 0,
            ..Self::default()
        }
    }

    /// Sets the maximum number of relaunches.
    pub fn with_max_relaunches(mut self, max: u32) -> Self {
        self.max_relaunches = max;
        self
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier.max(1.0);
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculates the extra delay for the n-th relaunch (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32 - 1);

        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.jitter {
            // Deterministic jitter derived from the attempt number
            let jitter_factor = 0.5 + (attempt as f64 * 0.618033988749895) % 0.5;
            capped_delay * jitter_factor
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }

    /// Returns whether a job relaunched `count` times may be relaunched again.
    pub fn should_relaunch(&self, count: u32) -> bool {
        count < self.max_relaunches
    }
}

/// Result of a relaunch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelaunchOutcome {
    /// The scan was re-submitted; the successor job carries the new scan id.
    Relaunched(ScanJob),
    /// The relaunch was refused or failed; the job was pushed to `ERROR`.
    Abandoned,
}

/// Re-submits a job's scan configuration after a recoverable outcome.
///
/// The relauncher never starts a poller itself; the caller watches the
/// successor job.
#[derive(Debug, Clone)]
pub struct Relauncher {
    backend: ArcBackend,
    notifier: ArcNotifier,
    target: String,
    policy: RelaunchPolicy,
}

impl Relauncher {
    /// Creates a relauncher.
    pub fn new(
        backend: ArcBackend,
        notifier: ArcNotifier,
        target: impl Into<String>,
        policy: RelaunchPolicy,
    ) -> Self {
        Self {
            backend,
            notifier,
            target: target.into(),
            policy,
        }
    }

    /// Returns the relaunch policy.
    pub fn policy(&self) -> &RelaunchPolicy {
        &self.policy
    }

    /// Relaunches the job's scan.
    pub async fn relaunch(&self, job: &ScanJob, cause: RelaunchCause) -> RelaunchOutcome {
        if !self.policy.should_relaunch(job.relaunch_count) {
            tracing::error!(
                job_id = %job.job_id,
                cause = cause.as_str(),
                relaunch_count = job.relaunch_count,
                max_relaunches = self.policy.max_relaunches,
                "Relaunch limit reached"
            );
            self.abandon(
                job,
                format!(
                    "Scan is not relaunched: limit of {} relaunches reached ({})",
                    self.policy.max_relaunches,
                    cause.as_str()
                ),
            )
            .await;
            return RelaunchOutcome::Abandoned;
        }

        match self.backend.launch_scan(job, &self.target).await {
            Ok(new_scan_id) => {
                let next = job.relaunched(new_scan_id);
                tracing::info!(
                    job_id = %job.job_id,
                    previous_scan_id = ?job.scanner_scan_id,
                    scanner_scan_id = ?next.scanner_scan_id,
                    cause = cause.as_str(),
                    relaunch_count = next.relaunch_count,
                    "Scan relaunched"
                );
                persist_log(
                    self.notifier.as_ref(),
                    &job.job_id,
                    &LogEntry::info(cause.message()),
                )
                .await;
                crate::audit::emit_relaunch(job, &next, cause);
                RelaunchOutcome::Relaunched(next)
            }
            Err(e) => {
                tracing::error!(
                    job_id = %job.job_id,
                    cause = cause.as_str(),
                    error = %e,
                    transient = e.is_transient(),
                    "Failed to relaunch scan"
                );
                self.abandon(job, "Failed to relaunch the scan".to_string())
                    .await;
                RelaunchOutcome::Abandoned
            }
        }
    }

    async fn abandon(&self, job: &ScanJob, message: String) {
        let update = StatusUpdate::new(
            job.job_id.clone(),
            LifecycleStatus::Error,
            job.scanner_scan_id.clone(),
        );
        push_status(self.notifier.as_ref(), &update).await;
        persist_log(self.notifier.as_ref(), &job.job_id, &LogEntry::error(message)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockBackend;
    use crate::callback::RecordingNotifier;
    use crate::core::{LogType, ScanConfig};
    use std::sync::Arc;

    fn job() -> ScanJob {
        ScanJob::new("job-1", "app-1", ScanConfig::new("https://example.com", "p1"))
            .with_scanner_scan_id("100")
    }

    #[test]
    fn test_default_policy() {
        let policy = RelaunchPolicy::default();
        assert_eq!(policy.max_relaunches, 5);
        assert!(!policy.jitter);
    }

    #[test]
    fn test_never() {
        let policy = RelaunchPolicy::never();
        assert!(!policy.should_relaunch(0));
    }

    #[test]
    fn test_delay_calculation() {
        let policy = RelaunchPolicy::new()
            .with_initial_delay(Duration::from_millis(100))
            .with_backoff_multiplier(2.0)
            .with_jitter(false);

        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_capped() {
        let policy = RelaunchPolicy::new()
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5))
            .with_backoff_multiplier(10.0);

        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_stays_below_cap() {
        let policy = RelaunchPolicy::new()
            .with_initial_delay(Duration::from_secs(10))
            .with_jitter(true);
        let delay = policy.delay_for_attempt(1);
        assert!(delay >= Duration::from_secs(5));
        assert!(delay <= Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_relaunch_success() {
        let backend = Arc::new(MockBackend::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let relauncher = Relauncher::new(
            backend.clone(),
            notifier.clone(),
            "host",
            RelaunchPolicy::default(),
        );

        let outcome = relauncher
            .relaunch(&job(), RelaunchCause::ScannerNotAvailable)
            .await;

        let next = match outcome {
            RelaunchOutcome::Relaunched(next) => next,
            other => panic!("unexpected outcome {other:?}"),
        };
        assert_eq!(next.job_id, "job-1");
        assert_ne!(next.scanner_scan_id.as_deref(), Some("100"));
        assert_eq!(next.relaunch_count, 1);
        assert_eq!(backend.launch_calls(), 1);
        assert!(notifier.status_updates().is_empty());

        let logs = notifier.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].severity, LogType::Info);
        assert_eq!(logs[0].message, RelaunchCause::ScannerNotAvailable.message());
    }

    #[tokio::test]
    async fn test_relaunch_failure_pushes_error() {
        let backend = Arc::new(MockBackend::new().with_launch_failure());
        let notifier = Arc::new(RecordingNotifier::new());
        let relauncher =
            Relauncher::new(backend, notifier.clone(), "host", RelaunchPolicy::default());

        let outcome = relauncher
            .relaunch(&job(), RelaunchCause::TimeLimitExceeded)
            .await;
        assert_eq!(outcome, RelaunchOutcome::Abandoned);

        let updates = notifier.status_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].status, LifecycleStatus::Error);
        assert_eq!(updates[0].scanner_scan_id.as_deref(), Some("100"));

        let errors = notifier.logs_with(LogType::Error);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Failed to relaunch the scan");
    }

    #[tokio::test]
    async fn test_relaunch_limit() {
        let backend = Arc::new(MockBackend::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let relauncher = Relauncher::new(
            backend.clone(),
            notifier.clone(),
            "host",
            RelaunchPolicy::new().with_max_relaunches(1),
        );

        let once = job().relaunched("101");
        let outcome = relauncher
            .relaunch(&once, RelaunchCause::TimeLimitExceeded)
            .await;

        assert_eq!(outcome, RelaunchOutcome::Abandoned);
        assert_eq!(backend.launch_calls(), 0);
        assert_eq!(notifier.status_updates()[0].status, LifecycleStatus::Error);
    }
}
