//! Translation of vendor statuses into the normalized lifecycle.
//!
//! The vendor reports "finished" for every scan whose process ended,
//! regardless of outcome. A finished scan therefore needs a second lookup of
//! its authentication and result sub-statuses before its lifecycle status is
//! known. Precedence within that second stage:
//!
//! 1. A `TIME_LIMIT_EXCEEDED` result triggers a relaunch and overrides
//!    everything else.
//! 2. Otherwise the scan is `COMPLETED` only if both authentication and
//!    results were successful, and `FAILED` in every other case.

use crate::core::{
    AuthStatus, LifecycleStatus, LogEntry, ResultStatus, ScanBackend, ScannerResult, VendorStatus,
};

pub(crate) const RUNNING_MESSAGE: &str = "Scan is Running.";
pub(crate) const ERROR_MESSAGE: &str = "Error occurred while scanning.";
pub(crate) const CANCELLED_MESSAGE: &str = "Scan is cancelled";
pub(crate) const COMPLETED_MESSAGE: &str = "Scan is successfully completed";

/// Why a scan has to be relaunched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaunchCause {
    /// The scan, or its result processing, ran past the vendor's time limit.
    TimeLimitExceeded,
    /// No scanner appliance was available.
    ScannerNotAvailable,
}

impl RelaunchCause {
    /// The log line persisted when a relaunch for this cause succeeds.
    pub fn message(&self) -> &'static str {
        match self {
            Self::TimeLimitExceeded => "Scan is relaunched due to time limit exceeded",
            Self::ScannerNotAvailable => "Scan is relaunched since the scanner is not available",
        }
    }

    /// Short machine-readable name, used in log and audit fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimeLimitExceeded => "time_limit_exceeded",
            Self::ScannerNotAvailable => "scanner_not_available",
        }
    }
}

/// What a vendor status maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappedOutcome {
    /// A normalized status, with the message to persist alongside it.
    Status {
        /// The normalized status.
        status: LifecycleStatus,
        /// Human-readable message for the job log.
        message: String,
    },
    /// The scan must be re-submitted; no status is reported.
    Relaunch(RelaunchCause),
}

/// The result of mapping one observed vendor status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    /// The outcome to reconcile.
    pub outcome: MappedOutcome,
    /// Diagnostic log lines gathered while classifying sub-statuses, in order.
    pub diagnostics: Vec<LogEntry>,
}

impl Mapping {
    fn status(status: LifecycleStatus, message: impl Into<String>) -> Self {
        Self {
            outcome: MappedOutcome::Status {
                status,
                message: message.into(),
            },
            diagnostics: Vec::new(),
        }
    }

    fn relaunch(cause: RelaunchCause) -> Self {
        Self {
            outcome: MappedOutcome::Relaunch(cause),
            diagnostics: Vec::new(),
        }
    }

    /// Returns the mapped lifecycle status, if the outcome is not a relaunch.
    pub fn lifecycle_status(&self) -> Option<LifecycleStatus> {
        match &self.outcome {
            MappedOutcome::Status { status, .. } => Some(*status),
            MappedOutcome::Relaunch(_) => None,
        }
    }
}

/// Classification of a finished scan's result sub-status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultVerdict {
    /// Results are usable.
    Succeeded,
    /// Results are unusable; the scan failed.
    Failed,
    /// The scan ran out of time and must be relaunched.
    Relaunch,
}

/// Maps a vendor status that needs no sub-status lookup.
///
/// Returns `None` for [`VendorStatus::Finished`], which is resolved by
/// [`map_finished`] once the sub-statuses are known.
pub fn map_vendor_status(vendor: VendorStatus) -> Option<Mapping> {
    match vendor {
        VendorStatus::Submitted | VendorStatus::Running => {
            Some(Mapping::status(LifecycleStatus::Running, RUNNING_MESSAGE))
        }
        VendorStatus::Error => Some(Mapping::status(LifecycleStatus::Error, ERROR_MESSAGE)),
        VendorStatus::Cancelled => {
            Some(Mapping::status(LifecycleStatus::Canceled, CANCELLED_MESSAGE))
        }
        VendorStatus::TimeLimitExceeded => {
            Some(Mapping::relaunch(RelaunchCause::TimeLimitExceeded))
        }
        VendorStatus::ScannerNotAvailable => {
            Some(Mapping::relaunch(RelaunchCause::ScannerNotAvailable))
        }
        VendorStatus::Finished => None,
    }
}

/// Classifies the authentication sub-status of a finished scan.
///
/// Only `SUCCESSFUL` counts. Partial and failed authentication each produce
/// their own error line; unknown values are unsuccessful without a line.
pub fn classify_auth(status: &AuthStatus) -> (bool, Option<LogEntry>) {
    match status {
        AuthStatus::Successful => (true, Some(LogEntry::info("Authentication is succeeded."))),
        AuthStatus::Partial => (
            false,
            Some(LogEntry::error(
                "Scan is failed since authentication is partially successful",
            )),
        ),
        AuthStatus::Failed => (
            false,
            Some(LogEntry::error("Scan is failed due to authentication failure")),
        ),
        AuthStatus::Other(_) => (false, None),
    }
}

/// Classifies the result sub-status of a finished scan.
pub fn classify_result(status: &ResultStatus) -> (ResultVerdict, Option<LogEntry>) {
    match status {
        ResultStatus::Successful => (
            ResultVerdict::Succeeded,
            Some(LogEntry::info(
                "Scan is completed on the scanner side. Please wait while reports are created and downloaded",
            )),
        ),
        ResultStatus::NoHostAlive | ResultStatus::NoWebService => (
            ResultVerdict::Failed,
            Some(LogEntry::error(format!(
                "Scan is failed with {status}. Please check the scanner documentation for more information"
            ))),
        ),
        ResultStatus::InvalidResults => (
            ResultVerdict::Failed,
            Some(LogEntry::error(
                "Scan is finished but the scan result is invalid. Please check the scanner documentation for more information",
            )),
        ),
        ResultStatus::ServiceError => (
            ResultVerdict::Failed,
            Some(LogEntry::error(
                "Scan is failed due to a service error. Please check the scanner documentation for more information",
            )),
        ),
        ResultStatus::InternalError => (
            ResultVerdict::Failed,
            Some(LogEntry::error(
                "Scan is failed due to a scan internal error. Please check the scanner documentation for more information",
            )),
        ),
        ResultStatus::TimeLimitExceeded => (ResultVerdict::Relaunch, None),
        ResultStatus::Other(_) => (ResultVerdict::Failed, None),
    }
}

/// Maps a finished scan from its authentication and result sub-statuses.
///
/// A relaunch carries no diagnostics: the authentication outcome of a scan
/// that is about to be re-submitted is not reported.
pub fn map_finished(auth: &AuthStatus, result: &ResultStatus) -> Mapping {
    let (verdict, result_log) = classify_result(result);
    if verdict == ResultVerdict::Relaunch {
        return Mapping::relaunch(RelaunchCause::TimeLimitExceeded);
    }

    let (auth_ok, auth_log) = classify_auth(auth);
    let diagnostics: Vec<LogEntry> = auth_log.into_iter().chain(result_log).collect();

    let outcome = match verdict {
        ResultVerdict::Succeeded if auth_ok => MappedOutcome::Status {
            status: LifecycleStatus::Completed,
            message: COMPLETED_MESSAGE.to_string(),
        },
        _ => MappedOutcome::Status {
            status: LifecycleStatus::Failed,
            message: format!(
                "Scan is finished but did not succeed (authentication: {auth}, results: {result})"
            ),
        },
    };

    Mapping {
        outcome,
        diagnostics,
    }
}

/// Maps an observed vendor status, querying the backend for the
/// sub-statuses when the scan has finished.
///
/// Authentication is fetched before results. A failing lookup is returned
/// as an error and handled like a failed status retrieval.
pub async fn map_status(
    backend: &dyn ScanBackend,
    target: &str,
    scan_id: &str,
    vendor: VendorStatus,
) -> ScannerResult<Mapping> {
    if let Some(mapping) = map_vendor_status(vendor) {
        return Ok(mapping);
    }

    let auth_raw = backend.retrieve_auth_status(target, scan_id).await?;
    let result_raw = backend.retrieve_result_status(target, scan_id).await?;

    let auth: AuthStatus = auth_raw.parse().unwrap_or_else(|e| match e {});
    let result: ResultStatus = result_raw.parse().unwrap_or_else(|e| match e {});

    tracing::debug!(
        scan_id = %scan_id,
        auth_status = %auth,
        result_status = %result,
        "Resolved finished scan sub-statuses"
    );

    Ok(map_finished(&auth, &result))
}
