//! # Scanpoll
//!
//! Status polling and reconciliation for asynchronous DAST scans.
//!
//! ## Overview
//!
//! Once a scan has been accepted by the vendor, scanpoll keeps one poller per
//! job that periodically asks the vendor for the scan's status and turns it
//! into a lifecycle status for the system of record:
//!
//! - Vendor statuses are normalized to `RUNNING`, `COMPLETED`, `FAILED`,
//!   `ERROR` or `CANCELED`
//! - Finished scans are refined with their authentication and result statuses
//! - Unchanged statuses are skipped, so each change is reported exactly once
//! - Completed scans trigger report generation
//! - Scans that hit a time limit or had no scanner are relaunched
//! - Every update is recorded as a structured audit event
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use scanpoll::prelude::*;
//! use scanpoll::backends::MockBackend;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = PollerRegistry::builder()
//!         .with_backend(MockBackend::new().with_statuses(["RUNNING", "FINISHED"]))
//!         .with_config(PollerConfig::new("vendor.example.com"))
//!         .build()?;
//!
//!     let job = ScanJob::new("job-1", "app-1", ScanConfig::new("https://example.com", "profile"))
//!         .with_scanner_scan_id("1234");
//!     registry.activate_default(job)?;
//!     registry.wait_until_inactive("job-1").await;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Core**: Status domains, jobs, collaborator traits and errors
//! - **Backends**: The vendor seam, with a scripted mock and a timeout wrapper
//! - **Callback**: Where logs and status updates are delivered
//! - **Report**: The report generation trigger
//! - **Status**: Mapping, reconciliation and relaunch
//! - **Poller**: Per-job scheduling and the registry of active pollers
//! - **Audit**: Structured audit events

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod backends;
pub mod callback;
pub mod core;
pub mod poller;
pub mod report;
pub mod status;

// Re-export commonly used types at the crate root
pub use crate::core::{
    CallbackNotifier, LifecycleStatus, LogType, PollerError, ReportTrigger, ScanBackend,
    ScanConfig, ScanJob, ScannerError, StatusUpdate, VendorStatus,
};

pub use crate::poller::{PollerConfig, PollerRegistry};
pub use crate::status::RelaunchPolicy;

/// Prelude module for convenient imports.
///
/// ```rust
/// use scanpoll::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{
        CallbackNotifier, LifecycleStatus, LogType, PollerError, ReportTrigger, ScanBackend,
        ScanConfig, ScanJob, ScannerError, StatusUpdate, VendorStatus,
    };
    pub use crate::poller::{PollerConfig, PollerRegistry};
    pub use crate::status::RelaunchPolicy;
}
