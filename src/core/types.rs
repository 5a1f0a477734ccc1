//! Core types used throughout the scanpoll library.
//!
//! This module defines the normalized lifecycle status reported to the
//! orchestrating system, the closed vendor status domains, and the payloads
//! handed to the callback notifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::ScannerError;

/// The normalized lifecycle status of a scan job.
///
/// `Submitted` and `Running` are non-terminal. Every other status is
/// terminal and stops polling for the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStatus {
    /// The scan was accepted by the backend but has not been observed running.
    Submitted,
    /// The scan is in progress.
    Running,
    /// The scan finished successfully and its report was generated.
    Completed,
    /// The scan finished but authentication or results were unsuccessful.
    Failed,
    /// The scan, or the machinery watching it, hit an error.
    Error,
    /// The scan was cancelled on the backend.
    Canceled,
}

impl LifecycleStatus {
    /// Returns `true` if no further transitions happen from this status.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Submitted | Self::Running)
    }

    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Error => "ERROR",
            Self::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The scan status as reported by the vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VendorStatus {
    /// Scan accepted, waiting for a scanner.
    Submitted,
    /// Scan in progress.
    Running,
    /// Scan process ended; the outcome needs a second lookup.
    Finished,
    /// The vendor hit an error while scanning.
    Error,
    /// Scan was cancelled.
    Cancelled,
    /// Scan ran past the vendor's time limit.
    TimeLimitExceeded,
    /// No scanner appliance was available to run the scan.
    ScannerNotAvailable,
}

impl VendorStatus {
    /// Returns the vendor's wire name for the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::Running => "RUNNING",
            Self::Finished => "FINISHED",
            Self::Error => "ERROR",
            Self::Cancelled => "CANCELED",
            Self::TimeLimitExceeded => "TIME_LIMIT_EXCEEDED",
            Self::ScannerNotAvailable => "SCANNER_NOT_AVAILABLE",
        }
    }
}

impl FromStr for VendorStatus {
    type Err = ScannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "SUBMITTED" => Ok(Self::Submitted),
            "RUNNING" => Ok(Self::Running),
            "FINISHED" => Ok(Self::Finished),
            "ERROR" => Ok(Self::Error),
            "CANCELED" | "CANCELLED" => Ok(Self::Cancelled),
            "TIME_LIMIT_EXCEEDED" => Ok(Self::TimeLimitExceeded),
            "SCANNER_NOT_AVAILABLE" => Ok(Self::ScannerNotAvailable),
            _ => Err(ScannerError::unrecognized("scan", s.trim())),
        }
    }
}

impl fmt::Display for VendorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication outcome of a finished scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    /// The scanner authenticated against the target.
    Successful,
    /// Authentication only partially succeeded.
    Partial,
    /// Authentication failed.
    Failed,
    /// Any other value reported by the vendor.
    Other(String),
}

impl FromStr for AuthStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match normalize(s).as_str() {
            "SUCCESSFUL" => Self::Successful,
            "PARTIAL" => Self::Partial,
            "FAILED" => Self::Failed,
            _ => Self::Other(s.trim().to_string()),
        })
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Successful => f.write_str("SUCCESSFUL"),
            Self::Partial => f.write_str("PARTIAL"),
            Self::Failed => f.write_str("FAILED"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// Result outcome of a finished scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultStatus {
    /// Results are usable.
    Successful,
    /// The target host did not respond.
    NoHostAlive,
    /// No web service was found on the target.
    NoWebService,
    /// The scan produced invalid results.
    InvalidResults,
    /// The vendor service failed.
    ServiceError,
    /// The scan engine failed internally.
    InternalError,
    /// The scan ran past the vendor's time limit before producing results.
    TimeLimitExceeded,
    /// Any other value reported by the vendor.
    Other(String),
}

impl FromStr for ResultStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match normalize(s).as_str() {
            "SUCCESSFUL" => Self::Successful,
            "NO_HOST_ALIVE" => Self::NoHostAlive,
            "NO_WEB_SERVICE" => Self::NoWebService,
            "SCAN_RESULTS_INVALID" => Self::InvalidResults,
            "SERVICE_ERROR" => Self::ServiceError,
            "SCAN_INTERNAL_ERROR" => Self::InternalError,
            "TIME_LIMIT_EXCEEDED" => Self::TimeLimitExceeded,
            _ => Self::Other(s.trim().to_string()),
        })
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Successful => "SUCCESSFUL",
            Self::NoHostAlive => "NO_HOST_ALIVE",
            Self::NoWebService => "NO_WEB_SERVICE",
            Self::InvalidResults => "SCAN_RESULTS_INVALID",
            Self::ServiceError => "SERVICE_ERROR",
            Self::InternalError => "SCAN_INTERNAL_ERROR",
            Self::TimeLimitExceeded => "TIME_LIMIT_EXCEEDED",
            Self::Other(raw) => raw,
        };
        f.write_str(name)
    }
}

fn normalize(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Severity of a log line persisted for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogType {
    /// Diagnostic detail.
    Debug,
    /// Normal progress.
    Info,
    /// Something unexpected that did not stop the job.
    Warn,
    /// A failure.
    Error,
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// A human-readable log line with its severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Severity of the line.
    pub severity: LogType,
    /// The message.
    pub message: String,
}

impl LogEntry {
    /// Creates an `INFO` entry.
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: LogType::Info,
            message: message.into(),
        }
    }

    /// Creates an `ERROR` entry.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: LogType::Error,
            message: message.into(),
        }
    }
}

/// A status update pushed to the orchestrating system of record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    /// The job the update belongs to.
    pub job_id: String,
    /// The normalized status.
    pub status: LifecycleStatus,
    /// Location of the generated report, for completed scans.
    pub report_path: Option<String>,
    /// The vendor's scan id for the current attempt.
    pub scanner_scan_id: Option<String>,
}

impl StatusUpdate {
    /// Creates an update without a report path.
    pub fn new(
        job_id: impl Into<String>,
        status: LifecycleStatus,
        scanner_scan_id: Option<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            report_path: None,
            scanner_scan_id,
        }
    }

    /// Attaches a report path.
    pub fn with_report_path(mut self, path: Option<String>) -> Self {
        self.report_path = path;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_terminal() {
        assert!(!LifecycleStatus::Submitted.is_terminal());
        assert!(!LifecycleStatus::Running.is_terminal());
        assert!(LifecycleStatus::Completed.is_terminal());
        assert!(LifecycleStatus::Failed.is_terminal());
        assert!(LifecycleStatus::Error.is_terminal());
        assert!(LifecycleStatus::Canceled.is_terminal());
    }

    #[test]
    fn test_vendor_status_parse_is_case_insensitive() {
        assert_eq!("running".parse::<VendorStatus>().unwrap(), VendorStatus::Running);
        assert_eq!(" Finished ".parse::<VendorStatus>().unwrap(), VendorStatus::Finished);
        assert_eq!("CANCELLED".parse::<VendorStatus>().unwrap(), VendorStatus::Cancelled);
        assert_eq!("canceled".parse::<VendorStatus>().unwrap(), VendorStatus::Cancelled);
        assert_eq!(
            "scanner_not_available".parse::<VendorStatus>().unwrap(),
            VendorStatus::ScannerNotAvailable
        );
    }

    #[test]
    fn test_vendor_status_unknown() {
        let err = "PROCESSING".parse::<VendorStatus>().unwrap_err();
        assert!(matches!(
            err,
            ScannerError::UnrecognizedStatus { kind: "scan", ref value } if value == "PROCESSING"
        ));
    }

    #[test]
    fn test_sub_status_parse_keeps_unknown_values() {
        assert_eq!("partial".parse::<AuthStatus>().unwrap(), AuthStatus::Partial);
        assert_eq!(
            "NONE".parse::<AuthStatus>().unwrap(),
            AuthStatus::Other("NONE".to_string())
        );
        assert_eq!(
            "SCAN_RESULTS_INVALID".parse::<ResultStatus>().unwrap(),
            ResultStatus::InvalidResults
        );
        assert_eq!(
            "SCAN_NOT_LAUNCHED".parse::<ResultStatus>().unwrap(),
            ResultStatus::Other("SCAN_NOT_LAUNCHED".to_string())
        );
    }

    #[test]
    fn test_status_update_json() {
        let update = StatusUpdate::new("job-1", LifecycleStatus::Completed, Some("42".into()))
            .with_report_path(Some("/reports/job-1.pdf".into()));
        let json = serde_json::to_value(&update).unwrap();

        assert_eq!(json["jobId"], "job-1");
        assert_eq!(json["status"], "COMPLETED");
        assert_eq!(json["reportPath"], "/reports/job-1.pdf");
        assert_eq!(json["scannerScanId"], "42");
    }

    #[test]
    fn test_log_type_display() {
        assert_eq!(LogType::Error.to_string(), "ERROR");
        assert!(LogType::Error > LogType::Info);
    }
}
