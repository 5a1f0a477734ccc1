//! Callback notifier implementations.
//!
//! The system of record that receives job logs and status updates is
//! external. This module provides:
//!
//! - [`TracingNotifier`] - writes logs and JSON status payloads to `tracing`
//! - [`RecordingNotifier`] - keeps every call in memory for inspection

mod recording;
mod tracing_notifier;

pub use recording::{LogRecord, NotifierCall, RecordingNotifier};
pub use tracing_notifier::TracingNotifier;
