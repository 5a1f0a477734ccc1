//! A notifier that forwards callbacks to `tracing`.

use crate::core::{CallbackNotifier, CallbackResult, LogType, StatusUpdate};

use async_trait::async_trait;

/// Writes job logs and status updates as `tracing` events.
///
/// Log lines are emitted at the level matching their severity under the
/// `scanpoll::callback` target. Status updates are emitted as their JSON
/// payload so a log shipper can forward them unchanged.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    /// Creates a new notifier.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CallbackNotifier for TracingNotifier {
    async fn persist_log(
        &self,
        job_id: &str,
        message: &str,
        severity: LogType,
    ) -> CallbackResult<()> {
        match severity {
            LogType::Debug => {
                tracing::debug!(target: "scanpoll::callback", job_id = %job_id, "{message}")
            }
            LogType::Info => {
                tracing::info!(target: "scanpoll::callback", job_id = %job_id, "{message}")
            }
            LogType::Warn => {
                tracing::warn!(target: "scanpoll::callback", job_id = %job_id, "{message}")
            }
            LogType::Error => {
                tracing::error!(target: "scanpoll::callback", job_id = %job_id, "{message}")
            }
        }
        Ok(())
    }

    async fn update_status(&self, update: &StatusUpdate) -> CallbackResult<()> {
        let payload = serde_json::to_string(update)?;
        tracing::info!(
            target: "scanpoll::callback",
            job_id = %update.job_id,
            status = %update.status,
            payload = %payload,
            "Scan status update"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LifecycleStatus;

    #[tokio::test]
    async fn test_tracing_notifier_accepts_all_calls() {
        let notifier = TracingNotifier::new();
        for severity in [LogType::Debug, LogType::Info, LogType::Warn, LogType::Error] {
            assert!(notifier.persist_log("job-1", "message", severity).await.is_ok());
        }

        let update = StatusUpdate::new("job-1", LifecycleStatus::Running, Some("7".into()));
        assert!(notifier.update_status(&update).await.is_ok());
    }
}
