//! Scheduling of per-job pollers.
//!
//! - [`config`] - Delays, timeouts and relaunch policy
//! - [`poller`] - A single job's poll loop
//! - [`registry`] - Activation and deactivation of pollers by job

pub mod config;
#[allow(clippy::module_inception)]
pub mod poller;
pub mod registry;

pub use config::PollerConfig;
pub use poller::{CycleOutcome, Poller, PollerContext, PollerExit};
pub use registry::{PollerRegistry, PollerRegistryBuilder};
