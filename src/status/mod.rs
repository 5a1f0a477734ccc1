//! Status mapping and reconciliation.
//!
//! - [`mapper`] - Vendor status to lifecycle status translation
//! - [`reconcile`] - Applies mapped statuses: callbacks, reports, relaunches
//! - [`relaunch`] - Relaunch policy and the relaunch action

pub mod mapper;
pub mod reconcile;
pub mod relaunch;

pub use mapper::{
    classify_auth, classify_result, map_finished, map_status, map_vendor_status, MappedOutcome,
    Mapping, RelaunchCause, ResultVerdict,
};
pub use reconcile::{ReconciliationState, Reconciler, Transition};
pub use relaunch::{RelaunchOutcome, RelaunchPolicy, Relauncher};

use crate::core::{CallbackNotifier, LogEntry, StatusUpdate};

/// Persists a log line, logging instead of failing if delivery fails.
pub(crate) async fn persist_log(notifier: &dyn CallbackNotifier, job_id: &str, entry: &LogEntry) {
    if let Err(e) = notifier
        .persist_log(job_id, &entry.message, entry.severity)
        .await
    {
        tracing::warn!(
            job_id = %job_id,
            severity = %entry.severity,
            error = %e,
            "Failed to persist scan log"
        );
    }
}

/// Publishes a status update and records it in the audit trail.
pub(crate) async fn push_status(notifier: &dyn CallbackNotifier, update: &StatusUpdate) {
    crate::audit::emit_status_update(update);
    if let Err(e) = notifier.update_status(update).await {
        tracing::warn!(
            job_id = %update.job_id,
            status = %update.status,
            error = %e,
            "Failed to publish status update"
        );
    }
}
