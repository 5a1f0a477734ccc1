//! Mock backend for testing.
//!
//! This module provides a scripted scan backend that can be used in tests
//! and demos to simulate a vendor's status progression without a real
//! scanning service.

use crate::core::{ScanBackend, ScanJob, ScannerError, ScannerResult};

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

/// A mock backend for testing purposes.
///
/// Scan statuses are served from a script. The last scripted status is
/// sticky: once the script is down to one entry, every further call
/// returns it.
///
/// # Examples
///
/// ```rust
/// use scanpoll::backends::MockBackend;
/// use std::time::Duration;
///
/// // A scan that runs for two cycles and then finishes successfully
/// let backend = MockBackend::new()
///     .with_statuses(["RUNNING", "RUNNING", "FINISHED"])
///     .with_auth_status("SUCCESSFUL")
///     .with_result_status("SUCCESSFUL");
///
/// // A backend whose status endpoint is down
/// let backend = MockBackend::new().with_status_failure();
///
/// // A slow backend
/// let backend = MockBackend::new().with_latency(Duration::from_millis(100));
/// ```
#[derive(Debug)]
pub struct MockBackend {
    /// Name of this backend instance.
    name: String,
    /// Remaining scripted scan statuses.
    statuses: Mutex<VecDeque<String>>,
    /// Authentication sub-status served for finished scans.
    auth_status: RwLock<String>,
    /// Result sub-status served for finished scans.
    result_status: RwLock<String>,
    /// Whether status retrieval fails.
    fail_status: AtomicBool,
    /// Whether authentication and result sub-status retrieval fails.
    fail_sub_status: AtomicBool,
    /// Whether scan launches fail.
    fail_launch: AtomicBool,
    /// Simulated latency for every call.
    latency: Option<Duration>,
    /// Scan ids passed to status retrieval, in call order.
    queried: Mutex<Vec<String>>,
    /// Counter used to generate scan ids on launch.
    next_scan_id: AtomicU64,
    status_calls: AtomicU64,
    auth_calls: AtomicU64,
    result_calls: AtomicU64,
    launch_calls: AtomicU64,
}

impl MockBackend {
    /// Creates a backend that reports every scan as running.
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            statuses: Mutex::new(VecDeque::from(["RUNNING".to_string()])),
            auth_status: RwLock::new("SUCCESSFUL".to_string()),
            result_status: RwLock::new("SUCCESSFUL".to_string()),
            fail_status: AtomicBool::new(false),
            fail_sub_status: AtomicBool::new(false),
            fail_launch: AtomicBool::new(false),
            latency: None,
            queried: Mutex::new(Vec::new()),
            next_scan_id: AtomicU64::new(1000),
            status_calls: AtomicU64::new(0),
            auth_calls: AtomicU64::new(0),
            result_calls: AtomicU64::new(0),
            launch_calls: AtomicU64::new(0),
        }
    }

    /// Sets the name of this backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the status script.
    pub fn with_statuses<I, S>(self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_statuses(statuses);
        self
    }

    /// Sets the authentication sub-status.
    pub fn with_auth_status(self, status: impl Into<String>) -> Self {
        self.set_auth_status(status);
        self
    }

    /// Sets the result sub-status.
    pub fn with_result_status(self, status: impl Into<String>) -> Self {
        self.set_result_status(status);
        self
    }

    /// Makes status retrieval fail.
    pub fn with_status_failure(self) -> Self {
        self.fail_status.store(true, Ordering::SeqCst);
        self
    }

    /// Makes authentication and result sub-status retrieval fail.
    pub fn with_sub_status_failure(self) -> Self {
        self.fail_sub_status.store(true, Ordering::SeqCst);
        self
    }

    /// Makes scan launches fail.
    pub fn with_launch_failure(self) -> Self {
        self.fail_launch.store(true, Ordering::SeqCst);
        self
    }

    /// Sets the simulated latency for every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Replaces the status script (mutable version).
    pub fn set_statuses<I, S>(&self, statuses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self
            .statuses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) =
            statuses.into_iter().map(Into::into).collect();
    }

    /// Sets the authentication sub-status (mutable version).
    pub fn set_auth_status(&self, status: impl Into<String>) {
        *self
            .auth_status
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = status.into();
    }

    /// Sets the result sub-status (mutable version).
    pub fn set_result_status(&self, status: impl Into<String>) {
        *self
            .result_status
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = status.into();
    }

    /// Enables or disables status retrieval failures.
    pub fn set_status_failure(&self, fail: bool) {
        self.fail_status.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of status retrievals.
    pub fn status_calls(&self) -> u64 {
        self.status_calls.load(Ordering::Relaxed)
    }

    /// Returns the number of authentication sub-status retrievals.
    pub fn auth_calls(&self) -> u64 {
        self.auth_calls.load(Ordering::Relaxed)
    }

    /// Returns the number of result sub-status retrievals.
    pub fn result_calls(&self) -> u64 {
        self.result_calls.load(Ordering::Relaxed)
    }

    /// Returns the number of scan launches.
    pub fn launch_calls(&self) -> u64 {
        self.launch_calls.load(Ordering::Relaxed)
    }

    /// Returns the scan ids passed to status retrieval, in call order.
    pub fn queried_scan_ids(&self) -> Vec<String> {
        self.queried
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_sub_status_failure(&self) -> ScannerResult<()> {
        if self.fail_sub_status.load(Ordering::SeqCst) {
            return Err(ScannerError::connection_failed(
                &self.name,
                "simulated sub-status failure",
            ));
        }
        Ok(())
    }

    fn next_status(&self) -> Option<String> {
        let mut statuses = self
            .statuses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScanBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn retrieve_scan_status(&self, _target: &str, scan_id: &str) -> ScannerResult<String> {
        self.status_calls.fetch_add(1, Ordering::Relaxed);
        self.queried
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(scan_id.to_string());
        self.simulate_latency().await;

        if self.fail_status.load(Ordering::SeqCst) {
            return Err(ScannerError::connection_failed(
                &self.name,
                "simulated failure",
            ));
        }

        self.next_status()
            .ok_or_else(|| ScannerError::internal("mock backend has no scripted status"))
    }

    async fn retrieve_auth_status(&self, _target: &str, _scan_id: &str) -> ScannerResult<String> {
        self.auth_calls.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;
        self.check_sub_status_failure()?;
        Ok(self
            .auth_status
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    async fn retrieve_result_status(
        &self,
        _target: &str,
        _scan_id: &str,
    ) -> ScannerResult<String> {
        self.result_calls.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;
        self.check_sub_status_failure()?;
        Ok(self
            .result_status
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    async fn launch_scan(&self, _job: &ScanJob, _target: &str) -> ScannerResult<String> {
        self.launch_calls.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;

        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(ScannerError::LaunchRejected {
                reason: "simulated failure".to_string(),
            });
        }

        let id = self.next_scan_id.fetch_add(1, Ordering::SeqCst);
        Ok(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ScanConfig;

    #[tokio::test]
    async fn test_mock_backend_script_is_sticky() {
        let backend = MockBackend::new().with_statuses(["SUBMITTED", "RUNNING", "FINISHED"]);

        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(backend.retrieve_scan_status("host", "1").await.unwrap());
        }

        assert_eq!(
            seen,
            vec!["SUBMITTED", "RUNNING", "FINISHED", "FINISHED", "FINISHED"]
        );
        assert_eq!(backend.status_calls(), 5);
        assert_eq!(backend.queried_scan_ids(), vec!["1"; 5]);
    }

    #[tokio::test]
    async fn test_mock_backend_status_failure() {
        let backend = MockBackend::new().with_status_failure();
        let err = backend.retrieve_scan_status("host", "1").await.unwrap_err();
        assert!(err.is_transient());

        backend.set_status_failure(false);
        assert!(backend.retrieve_scan_status("host", "1").await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_backend_sub_status_failure() {
        let backend = MockBackend::new()
            .with_statuses(["FINISHED"])
            .with_sub_status_failure();

        assert!(backend.retrieve_scan_status("host", "1").await.is_ok());
        assert!(backend.retrieve_auth_status("host", "1").await.is_err());
        assert!(backend.retrieve_result_status("host", "1").await.is_err());
        assert_eq!(backend.auth_calls(), 1);
        assert_eq!(backend.result_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_backend_launch_generates_ids() {
        let backend = MockBackend::new();
        let job = ScanJob::new("job", "app", ScanConfig::new("https://example.com", "p"));

        let first = backend.launch_scan(&job, "host").await.unwrap();
        let second = backend.launch_scan(&job, "host").await.unwrap();
        assert_ne!(first, second);
        assert_eq!(backend.launch_calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_backend_sub_statuses() {
        let backend = MockBackend::new()
            .with_auth_status("PARTIAL")
            .with_result_status("NO_HOST_ALIVE");

        assert_eq!(
            backend.retrieve_auth_status("host", "1").await.unwrap(),
            "PARTIAL"
        );
        assert_eq!(
            backend.retrieve_result_status("host", "1").await.unwrap(),
            "NO_HOST_ALIVE"
        );
    }
}
