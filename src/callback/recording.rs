//! A notifier that records every call in memory.

use crate::core::{CallbackError, CallbackNotifier, CallbackResult, LogType, StatusUpdate};

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// A persisted log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// The job the line belongs to.
    pub job_id: String,
    /// The message.
    pub message: String,
    /// Severity of the line.
    pub severity: LogType,
}

/// One call received by a [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierCall {
    /// `persist_log` was called.
    Log(LogRecord),
    /// `update_status` was called.
    Status(StatusUpdate),
}

/// Records log lines and status updates in call order.
///
/// Useful in tests, and for embedding applications that read the outcome
/// back instead of forwarding it.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<NotifierCall>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    /// Creates an empty notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a notifier that records calls but reports every delivery as failed.
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: AtomicBool::new(true),
        }
    }

    /// Returns every call, in order.
    pub fn calls(&self) -> Vec<NotifierCall> {
        self.lock().clone()
    }

    /// Returns the status updates, in order.
    pub fn status_updates(&self) -> Vec<StatusUpdate> {
        self.lock()
            .iter()
            .filter_map(|call| match call {
                NotifierCall::Status(update) => Some(update.clone()),
                NotifierCall::Log(_) => None,
            })
            .collect()
    }

    /// Returns the persisted log lines, in order.
    pub fn logs(&self) -> Vec<LogRecord> {
        self.lock()
            .iter()
            .filter_map(|call| match call {
                NotifierCall::Log(record) => Some(record.clone()),
                NotifierCall::Status(_) => None,
            })
            .collect()
    }

    /// Returns the persisted log lines with the given severity.
    pub fn logs_with(&self, severity: LogType) -> Vec<LogRecord> {
        self.logs()
            .into_iter()
            .filter(|record| record.severity == severity)
            .collect()
    }

    /// Returns the status updates for one job.
    pub fn status_updates_for(&self, job_id: &str) -> Vec<StatusUpdate> {
        self.status_updates()
            .into_iter()
            .filter(|update| update.job_id == job_id)
            .collect()
    }

    /// Clears all recorded calls.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<NotifierCall>> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: NotifierCall) -> CallbackResult<()> {
        self.lock().push(call);
        if self.fail.load(Ordering::SeqCst) {
            return Err(CallbackError::Delivery {
                message: "simulated delivery failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CallbackNotifier for RecordingNotifier {
    async fn persist_log(
        &self,
        job_id: &str,
        message: &str,
        severity: LogType,
    ) -> CallbackResult<()> {
        self.record(NotifierCall::Log(LogRecord {
            job_id: job_id.to_string(),
            message: message.to_string(),
            severity,
        }))
    }

    async fn update_status(&self, update: &StatusUpdate) -> CallbackResult<()> {
        self.record(NotifierCall::Status(update.clone()))
    }
}
