//! Time-bounded backend wrapper.

use crate::core::{ArcBackend, ScanBackend, ScanJob, ScannerError, ScannerResult};

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Wraps a backend and bounds every call with a timeout.
///
/// A poll cycle only suspends on backend calls, so bounding them keeps a
/// stuck vendor endpoint from stalling a job's poller indefinitely.
///
/// # Example
///
/// ```rust
/// use scanpoll::backends::{MockBackend, TimeoutBackend};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let bounded = TimeoutBackend::new(Arc::new(MockBackend::new()), Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct TimeoutBackend {
    inner: ArcBackend,
    timeout: Duration,
}

impl TimeoutBackend {
    /// Wraps `inner`, bounding each call by `timeout`.
    pub fn new(inner: ArcBackend, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Returns the configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the wrapped backend.
    pub fn inner(&self) -> &ArcBackend {
        &self.inner
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = ScannerResult<T>> + Send,
    ) -> ScannerResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    backend = self.inner.name(),
                    operation = operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Backend call timed out"
                );
                Err(ScannerError::timeout(operation, self.timeout))
            }
        }
    }
}

#[async_trait]
impl ScanBackend for TimeoutBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn retrieve_scan_status(&self, target: &str, scan_id: &str) -> ScannerResult<String> {
        self.bounded(
            "retrieve_scan_status",
            self.inner.retrieve_scan_status(target, scan_id),
        )
        .await
    }

    async fn retrieve_auth_status(&self, target: &str, scan_id: &str) -> ScannerResult<String> {
        self.bounded(
            "retrieve_auth_status",
            self.inner.retrieve_auth_status(target, scan_id),
        )
        .await
    }

    async fn retrieve_result_status(
        &self,
        target: &str,
        scan_id: &str,
    ) -> ScannerResult<String> {
        self.bounded(
            "retrieve_result_status",
            self.inner.retrieve_result_status(target, scan_id),
        )
        .await
    }

    async fn launch_scan(&self, job: &ScanJob, target: &str) -> ScannerResult<String> {
        self.bounded("launch_scan", self.inner.launch_scan(job, target))
            .await
    }
}
