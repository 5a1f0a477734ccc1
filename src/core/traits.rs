//! Collaborator traits for the scanpoll library.
//!
//! The poller drives three collaborators it does not own: the vendor API
//! client ([`ScanBackend`]), the system of record ([`CallbackNotifier`]) and
//! the report pipeline ([`ReportTrigger`]). Implementations are stateless
//! with respect to any single job and are shared across pollers, so they
//! must be `Send + Sync`.

use crate::core::error::{CallbackResult, ReportResult, ScannerResult};
use crate::core::job::ScanJob;
use crate::core::types::{LogType, StatusUpdate};

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// Client for the vulnerability scanning vendor.
///
/// # Implementation Notes
///
/// - Calls should be bounded by a timeout. Wrap the backend in
///   [`TimeoutBackend`](crate::backends::TimeoutBackend) if the client does
///   not enforce one itself.
/// - Status strings are returned raw; the poller parses them.
/// - Implementations should never panic; all failures are `ScannerError`s.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use scanpoll::core::{ScanBackend, ScanJob, ScannerResult};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct VendorClient;
///
/// #[async_trait]
/// impl ScanBackend for VendorClient {
///     fn name(&self) -> &str {
///         "vendor"
///     }
///
///     async fn retrieve_scan_status(&self, target: &str, scan_id: &str) -> ScannerResult<String> {
///         todo!()
///     }
///
///     // ...
/// }
/// ```
#[async_trait]
pub trait ScanBackend: Send + Sync + Debug {
    /// Returns the name of this backend.
    fn name(&self) -> &str;

    /// Returns the raw vendor status of a scan.
    async fn retrieve_scan_status(&self, target: &str, scan_id: &str) -> ScannerResult<String>;

    /// Returns the raw authentication status of a finished scan.
    async fn retrieve_auth_status(&self, target: &str, scan_id: &str) -> ScannerResult<String>;

    /// Returns the raw result status of a finished scan.
    async fn retrieve_result_status(&self, target: &str, scan_id: &str)
        -> ScannerResult<String>;

    /// Submits the job's configuration and returns the new vendor scan id.
    async fn launch_scan(&self, job: &ScanJob, target: &str) -> ScannerResult<String>;
}

/// The orchestrating system of record.
///
/// Receives human-readable log lines and normalized status updates.
#[async_trait]
pub trait CallbackNotifier: Send + Sync + Debug {
    /// Persists a log line for the job.
    async fn persist_log(&self, job_id: &str, message: &str, severity: LogType)
        -> CallbackResult<()>;

    /// Publishes a normalized status update.
    async fn update_status(&self, update: &StatusUpdate) -> CallbackResult<()>;
}

/// Produces and stores the report of a successfully completed scan.
#[async_trait]
pub trait ReportTrigger: Send + Sync + Debug {
    /// Generates the report and returns where it was stored, if anywhere.
    async fn generate_report(&self, app_id: &str, job_id: &str) -> ReportResult<Option<String>>;
}

/// An arc-wrapped backend for shared ownership.
pub type ArcBackend = Arc<dyn ScanBackend>;

/// An arc-wrapped notifier for shared ownership.
pub type ArcNotifier = Arc<dyn CallbackNotifier>;

/// An arc-wrapped report trigger for shared ownership.
pub type ArcReportTrigger = Arc<dyn ReportTrigger>;
