//! Poller configuration.

use crate::core::PollerError;
use crate::status::RelaunchPolicy;

use std::time::Duration;

/// Configuration shared by every poller of a registry.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Vendor API host the backend is addressed with.
    pub target: String,

    /// Delay before the first cycle, when `activate` is not given one.
    pub initial_delay: Duration,

    /// Delay between the end of one cycle and the start of the next.
    pub poll_interval: Duration,

    /// Upper bound for each backend call. `None` trusts the backend's own timeout.
    pub request_timeout: Option<Duration>,

    /// Relaunch limits and backoff.
    pub relaunch: RelaunchPolicy,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            initial_delay: Duration::from_secs(60),
            poll_interval: Duration::from_secs(60),
            request_timeout: Some(Duration::from_secs(120)),
            relaunch: RelaunchPolicy::default(),
        }
    }
}

impl PollerConfig {
    /// Creates a configuration for the given vendor host.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    /// Sets the vendor host.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Sets the default initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the default poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets or clears the per-call timeout.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the relaunch policy.
    pub fn with_relaunch_policy(mut self, policy: RelaunchPolicy) -> Self {
        self.relaunch = policy;
        self
    }

    /// Checks the configuration for values the poller cannot work with.
    pub fn validate(&self) -> Result<(), PollerError> {
        if self.target.trim().is_empty() {
            return Err(PollerError::configuration("vendor target host is required"));
        }
        validate_interval(self.poll_interval)?;
        if self.request_timeout == Some(Duration::ZERO) {
            return Err(PollerError::configuration(
                "request timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_interval(interval: Duration) -> Result<(), PollerError> {
    if interval.is_zero() {
        return Err(PollerError::configuration(
            "poll interval must be greater than zero",
        ));
    }
    Ok(())
}
