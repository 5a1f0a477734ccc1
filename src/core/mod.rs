//! Core types and traits for the scanpoll library.
//!
//! - [`types`] - Lifecycle and vendor status domains, log and update payloads
//! - [`job`] - Scan jobs and their configuration
//! - [`traits`] - The backend, notifier and report collaborator traits
//! - [`error`] - Structured error types

pub mod error;
pub mod job;
pub mod traits;
pub mod types;

pub use error::{
    CallbackError, CallbackResult, PollerError, ReportError, ReportResult, ScannerError,
    ScannerResult,
};
pub use job::{ApplianceType, AuthKind, AuthReference, ScanConfig, ScanJob};
pub use traits::{
    ArcBackend, ArcNotifier, ArcReportTrigger, CallbackNotifier, ReportTrigger, ScanBackend,
};
pub use types::{
    AuthStatus, LifecycleStatus, LogEntry, LogType, ResultStatus, StatusUpdate, VendorStatus,
};
