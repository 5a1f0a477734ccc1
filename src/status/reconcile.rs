//! The reconciliation engine.
//!
//! Given a freshly mapped status, the reconciler decides which side effects
//! to run for the job:
//!
//! | Mapped status | Effect |
//! |---|---|
//! | `SUBMITTED` / `RUNNING` | persist INFO log, push `RUNNING`, keep polling |
//! | `COMPLETED` | generate the report, push `COMPLETED`, persist INFO log, stop |
//! | `CANCELED` / `ERROR` / `FAILED` | push the status, persist ERROR log, stop |
//! | relaunch | re-submit the scan, stop watching the old scan id |

use crate::core::{
    ArcNotifier, ArcReportTrigger, LifecycleStatus, LogEntry, ScanJob, ScannerError,
    StatusUpdate, VendorStatus,
};
use crate::status::mapper::{MappedOutcome, Mapping};
use crate::status::relaunch::{RelaunchOutcome, Relauncher};
use crate::status::{persist_log, push_status};

const RETRIEVAL_FAILED_MESSAGE: &str = "Could not retrieve the status";
const REPORT_FAILED_MESSAGE: &str = "Failed to generate the scan report";

/// Per-job state, owned by the job's poller and mutated only from its cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationState {
    current_status: LifecycleStatus,
    current_vendor_status: Option<VendorStatus>,
    pending_log_message: Option<String>,
}

impl ReconciliationState {
    /// Creates the state of a freshly submitted job.
    ///
    /// No vendor status has been observed yet, so the first observation is
    /// always reconciled.
    pub fn new() -> Self {
        Self {
            current_status: LifecycleStatus::Submitted,
            current_vendor_status: None,
            pending_log_message: None,
        }
    }

    /// Returns the last status pushed to the system of record.
    pub fn current_status(&self) -> LifecycleStatus {
        self.current_status
    }

    /// Returns the last vendor status observed.
    pub fn current_vendor_status(&self) -> Option<VendorStatus> {
        self.current_vendor_status
    }

    /// Records an observed vendor status.
    ///
    /// Returns `false` if it equals the previous observation, in which case
    /// the cycle has nothing to do.
    pub fn observe(&mut self, vendor: VendorStatus) -> bool {
        if self.current_vendor_status == Some(vendor) {
            return false;
        }
        self.current_vendor_status = Some(vendor);
        true
    }

    fn take_log_message(&mut self) -> String {
        self.pending_log_message.take().unwrap_or_default()
    }
}

impl Default for ReconciliationState {
    fn default() -> Self {
        Self::new()
    }
}

/// What a reconciled cycle leads to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The job is still in progress; keep polling.
    Continue(LifecycleStatus),
    /// The job reached a terminal status; stop polling.
    Terminated(LifecycleStatus),
    /// The scan was re-submitted; stop polling the old scan id and watch the
    /// successor job instead.
    Relaunched(ScanJob),
}

impl Transition {
    /// Returns `true` if the poller for the current scan id must stop.
    pub fn stops_polling(&self) -> bool {
        !matches!(self, Self::Continue(_))
    }
}

/// Applies mapped statuses to a job.
#[derive(Debug, Clone)]
pub struct Reconciler {
    notifier: ArcNotifier,
    report: ArcReportTrigger,
    relauncher: Relauncher,
}

impl Reconciler {
    /// Creates a reconciler.
    pub fn new(notifier: ArcNotifier, report: ArcReportTrigger, relauncher: Relauncher) -> Self {
        Self {
            notifier,
            report,
            relauncher,
        }
    }

    /// Reconciles one mapped status.
    ///
    /// Diagnostics gathered by the mapper are persisted first, in order.
    pub async fn reconcile(
        &self,
        job: &ScanJob,
        state: &mut ReconciliationState,
        mapping: Mapping,
    ) -> Transition {
        for entry in &mapping.diagnostics {
            persist_log(self.notifier.as_ref(), &job.job_id, entry).await;
        }

        let (status, message) = match mapping.outcome {
            MappedOutcome::Relaunch(cause) => {
                return match self.relauncher.relaunch(job, cause).await {
                    RelaunchOutcome::Relaunched(next) => Transition::Relaunched(next),
                    RelaunchOutcome::Abandoned => {
                        state.current_status = LifecycleStatus::Error;
                        Transition::Terminated(LifecycleStatus::Error)
                    }
                };
            }
            MappedOutcome::Status { status, message } => (status, message),
        };

        state.pending_log_message = Some(message);
        let previous = state.current_status;

        let transition = match status {
            LifecycleStatus::Submitted | LifecycleStatus::Running => {
                let message = state.take_log_message();
                persist_log(self.notifier.as_ref(), &job.job_id, &LogEntry::info(message)).await;
                self.push(job, LifecycleStatus::Running, None).await;
                state.current_status = LifecycleStatus::Running;
                Transition::Continue(LifecycleStatus::Running)
            }
            LifecycleStatus::Completed => {
                let message = state.take_log_message();
                match self.report.generate_report(&job.app_id, &job.job_id).await {
                    Ok(report_path) => {
                        self.push(job, LifecycleStatus::Completed, report_path).await;
                        persist_log(self.notifier.as_ref(), &job.job_id, &LogEntry::info(message))
                            .await;
                        state.current_status = LifecycleStatus::Completed;
                        Transition::Terminated(LifecycleStatus::Completed)
                    }
                    Err(e) => {
                        tracing::error!(
                            job_id = %job.job_id,
                            app_id = %job.app_id,
                            error = %e,
                            "Report generation failed"
                        );
                        self.push(job, LifecycleStatus::Error, None).await;
                        persist_log(
                            self.notifier.as_ref(),
                            &job.job_id,
                            &LogEntry::error(REPORT_FAILED_MESSAGE),
                        )
                        .await;
                        state.current_status = LifecycleStatus::Error;
                        Transition::Terminated(LifecycleStatus::Error)
                    }
                }
            }
            LifecycleStatus::Canceled | LifecycleStatus::Error | LifecycleStatus::Failed => {
                self.push(job, status, None).await;
                let message = state.take_log_message();
                persist_log(self.notifier.as_ref(), &job.job_id, &LogEntry::error(message)).await;
                state.current_status = status;
                Transition::Terminated(status)
            }
        };

        if previous != state.current_status {
            tracing::info!(
                job_id = %job.job_id,
                scanner_scan_id = ?job.scanner_scan_id,
                from = %previous,
                to = %state.current_status,
                "Scan status changed"
            );
        }

        transition
    }

    /// Handles a cycle whose status lookup failed.
    ///
    /// The job is pushed to `ERROR` and polling stops; the cycle is not retried.
    pub async fn retrieval_failed(
        &self,
        job: &ScanJob,
        state: &mut ReconciliationState,
        error: &ScannerError,
    ) -> Transition {
        tracing::error!(
            job_id = %job.job_id,
            scanner_scan_id = ?job.scanner_scan_id,
            error = %error,
            transient = error.is_transient(),
            "Could not retrieve scan status"
        );

        self.push(job, LifecycleStatus::Error, None).await;
        persist_log(
            self.notifier.as_ref(),
            &job.job_id,
            &LogEntry::error(RETRIEVAL_FAILED_MESSAGE),
        )
        .await;
        state.current_status = LifecycleStatus::Error;
        Transition::Terminated(LifecycleStatus::Error)
    }

    async fn push(&self, job: &ScanJob, status: LifecycleStatus, report_path: Option<String>) {
        let update = StatusUpdate::new(job.job_id.clone(), status, job.scanner_scan_id.clone())
            .with_report_path(report_path);
        push_status(self.notifier.as_ref(), &update).await;
    }
}
