//! Scan backend implementations.
//!
//! The vendor wire protocol lives outside this crate; backends here are the
//! pieces the poller needs around it.
//!
//! ## Available Backends
//!
//! - [`mock`] - A scripted backend for tests and demos
//! - [`timeout`] - A wrapper that bounds every call of another backend
//!
//! ## Implementing a Vendor Backend
//!
//! ```rust,ignore
//! use scanpoll::core::{ScanBackend, ScanJob, ScannerResult};
//! use async_trait::async_trait;
//!
//! #[derive(Debug)]
//! pub struct VendorClient {
//!     // HTTP client, credentials...
//! }
//!
//! #[async_trait]
//! impl ScanBackend for VendorClient {
//!     fn name(&self) -> &str {
//!         "vendor"
//!     }
//!
//!     async fn retrieve_scan_status(&self, target: &str, scan_id: &str) -> ScannerResult<String> {
//!         // GET the scan, return its status string
//!         todo!()
//!     }
//!
//!     // retrieve_auth_status, retrieve_result_status, launch_scan...
//! }
//! ```

pub mod mock;
pub mod timeout;

pub use mock::MockBackend;
pub use timeout::TimeoutBackend;
