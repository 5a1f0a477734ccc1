//! Error types for the scanpoll library.
//!
//! Every failure scenario has a typed error. Errors raised inside a poll
//! cycle never escape the polling task; they are converted into a normalized
//! lifecycle status plus a log entry by the reconciler.

use std::time::Duration;
use thiserror::Error;

/// Errors returned by a scan backend (the vendor API client).
#[derive(Debug, Error)]
pub enum ScannerError {
    /// The backend is unavailable or not responding.
    #[error("backend '{backend}' is unavailable: {reason}")]
    Unavailable {
        /// Name of the backend.
        backend: String,
        /// Human-readable reason for unavailability.
        reason: String,
    },

    /// A backend call did not complete within its time bound.
    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        /// The backend operation that timed out.
        operation: String,
        /// How long the call ran before it was abandoned.
        elapsed: Duration,
    },

    /// Failed to connect to the backend.
    #[error("connection to backend '{backend}' failed: {message}")]
    ConnectionFailed {
        /// Name of the backend.
        backend: String,
        /// Error message describing the failure.
        message: String,
    },

    /// The vendor API answered with an error response.
    #[error("vendor API error{}: {message}", .code.as_deref().map(|c| format!(" {c}")).unwrap_or_default())]
    Api {
        /// Vendor response code, if one was returned.
        code: Option<String>,
        /// Error message from the vendor.
        message: String,
    },

    /// The backend returned a status string outside the known domain.
    #[error("unrecognized {kind} status '{value}'")]
    UnrecognizedStatus {
        /// Which status domain was being parsed.
        kind: &'static str,
        /// The raw value that failed to parse.
        value: String,
    },

    /// The backend refused to launch a scan.
    #[error("scan launch rejected: {reason}")]
    LaunchRejected {
        /// Reason given by the backend.
        reason: String,
    },

    /// An internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl ScannerError {
    /// Returns `true` if the failure is likely to clear up on its own.
    ///
    /// Transient errors are still surfaced as `ERROR` for the job; the flag
    /// is informational and is attached to log events.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::Timeout { .. } | Self::ConnectionFailed { .. }
        )
    }

    /// Creates an `Unavailable` error.
    pub fn unavailable(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            backend: backend.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `Timeout` error.
    pub fn timeout(operation: impl Into<String>, elapsed: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed,
        }
    }

    /// Creates a `ConnectionFailed` error.
    pub fn connection_failed(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Creates an `UnrecognizedStatus` error.
    pub fn unrecognized(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnrecognizedStatus {
            kind,
            value: value.into(),
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Errors raised while delivering logs or status updates to the system of record.
#[derive(Debug, Error)]
pub enum CallbackError {
    /// The callback could not be delivered.
    #[error("callback delivery failed: {message}")]
    Delivery {
        /// Description of the failure.
        message: String,
    },

    /// The payload could not be serialized.
    #[error("failed to serialize callback payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while generating the report of a completed scan.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The report could not be produced.
    #[error("report generation failed for application '{app_id}': {reason}")]
    Generation {
        /// Target application identifier.
        app_id: String,
        /// Reason for the failure.
        reason: String,
    },

    /// The backend failed while creating or downloading the report.
    #[error(transparent)]
    Scanner(#[from] ScannerError),
}

/// Errors raised when starting or managing pollers.
#[derive(Debug, Error)]
pub enum PollerError {
    /// A poller is already running for the job.
    #[error("a poller is already active for job '{job_id}'")]
    AlreadyActive {
        /// The job identifier.
        job_id: String,
    },

    /// The job has no scanner scan id yet, so there is nothing to poll.
    #[error("job '{job_id}' has no scanner scan id")]
    MissingScanId {
        /// The job identifier.
        job_id: String,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },
}

impl PollerError {
    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// A specialized `Result` type for backend operations.
pub type ScannerResult<T> = Result<T, ScannerError>;

/// A specialized `Result` type for callback operations.
pub type CallbackResult<T> = Result<T, CallbackError>;

/// A specialized `Result` type for report operations.
pub type ReportResult<T> = Result<T, ReportError>;
