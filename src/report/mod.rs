//! Report trigger implementations.
//!
//! Rendering and storing reports is the job of an external pipeline. The
//! poller invokes it exactly once per job, when the scan completes.

use crate::core::{ReportError, ReportResult, ReportTrigger};

use async_trait::async_trait;
use std::sync::Mutex;

/// A report trigger that does nothing.
///
/// Use this when reports are produced out of band; completed scans are
/// still reported as `COMPLETED`, without a report path.
#[derive(Debug, Clone, Default)]
pub struct NoOpReportTrigger;

impl NoOpReportTrigger {
    /// Creates a new no-op trigger.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReportTrigger for NoOpReportTrigger {
    async fn generate_report(&self, app_id: &str, job_id: &str) -> ReportResult<Option<String>> {
        tracing::debug!(app_id = %app_id, job_id = %job_id, "NoOp report trigger: no report generated");
        Ok(None)
    }
}

/// A report trigger that records its invocations.
#[derive(Debug, Default)]
pub struct RecordingReportTrigger {
    calls: Mutex<Vec<(String, String)>>,
    report_path: Option<String>,
    fail: bool,
}

impl RecordingReportTrigger {
    /// Creates a trigger that succeeds without a report path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns this path from every successful invocation.
    pub fn with_report_path(mut self, path: impl Into<String>) -> Self {
        self.report_path = Some(path.into());
        self
    }

    /// Makes every invocation fail.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Returns the `(app_id, job_id)` pairs the trigger was invoked with.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ReportTrigger for RecordingReportTrigger {
    async fn generate_report(&self, app_id: &str, job_id: &str) -> ReportResult<Option<String>> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((app_id.to_string(), job_id.to_string()));

        if self.fail {
            return Err(ReportError::Generation {
                app_id: app_id.to_string(),
                reason: "simulated failure".to_string(),
            });
        }
        Ok(self.report_path.clone())
    }
}
