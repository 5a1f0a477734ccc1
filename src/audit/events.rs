//! Audit event types and emission functions.

use crate::core::{ScanJob, StatusUpdate};
use crate::status::RelaunchCause;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Base trait for audit events.
pub trait AuditEvent: Serialize {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the timestamp of the event.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Serializes the event as a JSON line.
    fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Audit event for a status update pushed to the system of record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusAuditEvent {
    /// Unique event ID.
    pub event_id: Uuid,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Job ID.
    pub job_id: String,

    /// Normalized status that was pushed.
    pub status: String,

    /// Vendor scan ID of the current attempt.
    pub scanner_scan_id: Option<String>,

    /// Report location, for completed scans.
    pub report_path: Option<String>,
}

impl AuditEvent for StatusAuditEvent {
    fn event_type(&self) -> &'static str {
        "status_update"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Audit event for an automatic relaunch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaunchAuditEvent {
    /// Unique event ID.
    pub event_id: Uuid,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Job ID.
    pub job_id: String,

    /// Vendor scan ID that was abandoned.
    pub previous_scan_id: Option<String>,

    /// Vendor scan ID of the re-submitted scan.
    pub scanner_scan_id: Option<String>,

    /// Why the scan was relaunched.
    pub cause: String,

    /// Number of relaunches so far, including this one.
    pub relaunch_count: u32,
}

impl AuditEvent for RelaunchAuditEvent {
    fn event_type(&self) -> &'static str {
        "scan_relaunched"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Whether a poller started or stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollerLifecycle {
    /// The poller was scheduled.
    Activated,
    /// The poller stopped and released its resources.
    Deactivated,
}

/// Audit event for a poller starting or stopping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerAuditEvent {
    /// Unique event ID.
    pub event_id: Uuid,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Activated or deactivated.
    pub lifecycle: PollerLifecycle,

    /// Job ID.
    pub job_id: String,

    /// Vendor scan ID being watched.
    pub scanner_scan_id: Option<String>,

    /// Delay before the first cycle, for activations.
    pub initial_delay_ms: Option<u64>,

    /// Why the poller stopped, for deactivations.
    pub reason: Option<String>,
}

impl AuditEvent for PollerAuditEvent {
    fn event_type(&self) -> &'static str {
        match self.lifecycle {
            PollerLifecycle::Activated => "poller_activated",
            PollerLifecycle::Deactivated => "poller_deactivated",
        }
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Emits an audit event for a status update.
pub fn emit_status_update(update: &StatusUpdate) -> StatusAuditEvent {
    let event = StatusAuditEvent {
        event_id: Uuid::new_v4(),
        timestamp: Utc::now(),
        job_id: update.job_id.clone(),
        status: update.status.to_string(),
        scanner_scan_id: update.scanner_scan_id.clone(),
        report_path: update.report_path.clone(),
    };

    tracing::info!(
        target: "scanpoll::audit",
        event_type = event.event_type(),
        event_id = %event.event_id,
        job_id = %event.job_id,
        status = %event.status,
        scanner_scan_id = ?event.scanner_scan_id,
        report_path = ?event.report_path,
        "Scan status updated"
    );

    event
}

/// Emits an audit event for a relaunch.
pub fn emit_relaunch(previous: &ScanJob, next: &ScanJob, cause: RelaunchCause) -> RelaunchAuditEvent {
    let event = RelaunchAuditEvent {
        event_id: Uuid::new_v4(),
        timestamp: Utc::now(),
        job_id: next.job_id.clone(),
        previous_scan_id: previous.scanner_scan_id.clone(),
        scanner_scan_id: next.scanner_scan_id.clone(),
        cause: cause.as_str().to_string(),
        relaunch_count: next.relaunch_count,
    };

    tracing::info!(
        target: "scanpoll::audit",
        event_type = event.event_type(),
        event_id = %event.event_id,
        job_id = %event.job_id,
        previous_scan_id = ?event.previous_scan_id,
        scanner_scan_id = ?event.scanner_scan_id,
        cause = %event.cause,
        relaunch_count = event.relaunch_count,
        "Scan relaunched"
    );

    event
}

/// Emits an audit event for a poller being scheduled.
pub fn emit_poller_activated(job: &ScanJob, initial_delay: Duration) -> PollerAuditEvent {
    let event = PollerAuditEvent {
        event_id: Uuid::new_v4(),
        timestamp: Utc::now(),
        lifecycle: PollerLifecycle::Activated,
        job_id: job.job_id.clone(),
        scanner_scan_id: job.scanner_scan_id.clone(),
        initial_delay_ms: Some(initial_delay.as_millis() as u64),
        reason: None,
    };

    tracing::info!(
        target: "scanpoll::audit",
        event_type = event.event_type(),
        event_id = %event.event_id,
        job_id = %event.job_id,
        scanner_scan_id = ?event.scanner_scan_id,
        initial_delay_ms = ?event.initial_delay_ms,
        "Poller activated"
    );

    event
}

/// Emits an audit event for a poller stopping.
pub fn emit_poller_deactivated(job: &ScanJob, reason: &str) -> PollerAuditEvent {
    let event = PollerAuditEvent {
        event_id: Uuid::new_v4(),
        timestamp: Utc::now(),
        lifecycle: PollerLifecycle::Deactivated,
        job_id: job.job_id.clone(),
        scanner_scan_id: job.scanner_scan_id.clone(),
        initial_delay_ms: None,
        reason: Some(reason.to_string()),
    };

    tracing::info!(
        target: "scanpoll::audit",
        event_type = event.event_type(),
        event_id = %event.event_id,
        job_id = %event.job_id,
        scanner_scan_id = ?event.scanner_scan_id,
        reason = ?event.reason,
        "Poller deactivated"
    );

    event
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LifecycleStatus, ScanConfig};

    fn job() -> ScanJob {
        ScanJob::new("job-1", "app-1", ScanConfig::new("https://example.com", "p1"))
            .with_scanner_scan_id("100")
    }

    #[test]
    fn test_status_event() {
        let update = StatusUpdate::new("job-1", LifecycleStatus::Completed, Some("100".into()))
            .with_report_path(Some("/r.pdf".into()));
        let event = emit_status_update(&update);

        assert_eq!(event.event_type(), "status_update");
        assert_eq!(event.status, "COMPLETED");
        assert_eq!(event.report_path.as_deref(), Some("/r.pdf"));
    }

    #[test]
    fn test_relaunch_event() {
        let previous = job();
        let next = previous.relaunched("101");
        let event = emit_relaunch(&previous, &next, RelaunchCause::TimeLimitExceeded);

        assert_eq!(event.previous_scan_id.as_deref(), Some("100"));
        assert_eq!(event.scanner_scan_id.as_deref(), Some("101"));
        assert_eq!(event.cause, "time_limit_exceeded");
        assert_eq!(event.relaunch_count, 1);
    }

    #[test]
    fn test_poller_events_serialize() {
        let activated = emit_poller_activated(&job(), Duration::from_secs(60));
        assert_eq!(activated.event_type(), "poller_activated");
        assert_eq!(activated.initial_delay_ms, Some(60_000));

        let deactivated = emit_poller_deactivated(&job(), "terminal status COMPLETED");
        assert_eq!(deactivated.event_type(), "poller_deactivated");

        let json: serde_json::Value =
            serde_json::from_str(&deactivated.to_json().unwrap()).unwrap();
        assert_eq!(json["lifecycle"], "deactivated");
        assert_eq!(json["job_id"], "job-1");
        assert_eq!(json["reason"], "terminal status COMPLETED");
    }
}
