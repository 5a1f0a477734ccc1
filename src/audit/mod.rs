//! Structured audit logging.
//!
//! Every status update, relaunch and poller start/stop is emitted as a
//! structured `tracing` event under the `scanpoll::audit` target, so any
//! subscriber (JSON file, OpenTelemetry, etc.) can keep a durable trail of
//! what happened to each job.

mod events;

pub use events::{
    emit_poller_activated, emit_poller_deactivated, emit_relaunch, emit_status_update,
    AuditEvent, PollerAuditEvent, PollerLifecycle, RelaunchAuditEvent, StatusAuditEvent,
};
