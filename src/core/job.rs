//! Scan jobs and their submitted configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::core::error::PollerError;

/// Where the scanner appliance runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplianceType {
    /// The vendor's cloud scanners.
    External,
    /// A scanner appliance inside the customer network.
    Internal {
        /// Identifier of the appliance.
        appliance_id: String,
    },
}

impl fmt::Display for ApplianceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::External => write!(f, "EXTERNAL"),
            Self::Internal { appliance_id } => write!(f, "INTERNAL({appliance_id})"),
        }
    }
}

/// The kind of web application authentication attached to a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthKind {
    /// No authentication.
    None,
    /// Form or HTTP authentication with a username and password.
    Standard,
    /// A recorded Selenium login script.
    Selenium,
}

impl FromStr for AuthKind {
    type Err = PollerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(Self::None),
            "STANDARD" => Ok(Self::Standard),
            "SELENIUM" => Ok(Self::Selenium),
            other => Err(PollerError::configuration(format!(
                "unknown authentication type '{other}', expected NONE/STANDARD/SELENIUM"
            ))),
        }
    }
}

/// Reference to an authentication record already stored on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthReference {
    /// Backend identifier of the authentication record.
    pub record_id: String,
    /// Kind of authentication the record holds.
    pub kind: AuthKind,
}

/// The configuration a scan was submitted with.
///
/// Immutable once submitted; a relaunch re-submits the same configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// URL of the web application under test.
    pub target_url: String,
    /// Vendor option profile used for the scan.
    pub profile_id: String,
    /// Scanner appliance selection.
    pub appliance: ApplianceType,
    /// Whether progressive scanning is enabled.
    pub progressive_scan: bool,
    /// Optional authentication record.
    pub auth: Option<AuthReference>,
}

impl ScanConfig {
    /// Creates a configuration using the external scanners and no authentication.
    pub fn new(target_url: impl Into<String>, profile_id: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            profile_id: profile_id.into(),
            appliance: ApplianceType::External,
            progressive_scan: false,
            auth: None,
        }
    }

    /// Sets the scanner appliance.
    pub fn with_appliance(mut self, appliance: ApplianceType) -> Self {
        self.appliance = appliance;
        self
    }

    /// Enables or disables progressive scanning.
    pub fn with_progressive_scan(mut self, enabled: bool) -> Self {
        self.progressive_scan = enabled;
        self
    }

    /// Attaches an authentication record.
    pub fn with_auth(mut self, record_id: impl Into<String>, kind: AuthKind) -> Self {
        self.auth = Some(AuthReference {
            record_id: record_id.into(),
            kind,
        });
        self
    }
}

/// One scan attempt tracked by a poller.
///
/// The job id is stable across relaunches; the scanner scan id changes each
/// time the configuration is re-submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanJob {
    /// Identifier assigned by the orchestrating system.
    pub job_id: String,
    /// Identifier of the target application on the backend.
    pub app_id: String,
    /// Vendor scan id, set once the backend accepted the scan.
    pub scanner_scan_id: Option<String>,
    /// The submitted configuration.
    pub config: Arc<ScanConfig>,
    /// How many times this job has been relaunched.
    pub relaunch_count: u32,
}

impl ScanJob {
    /// Creates a job that has not been accepted by the backend yet.
    pub fn new(job_id: impl Into<String>, app_id: impl Into<String>, config: ScanConfig) -> Self {
        Self {
            job_id: job_id.into(),
            app_id: app_id.into(),
            scanner_scan_id: None,
            config: Arc::new(config),
            relaunch_count: 0,
        }
    }

    /// Sets the vendor scan id.
    pub fn with_scanner_scan_id(mut self, scan_id: impl Into<String>) -> Self {
        self.scanner_scan_id = Some(scan_id.into());
        self
    }

    /// Returns the vendor scan id, or an error if the scan was never accepted.
    pub fn require_scan_id(&self) -> Result<&str, PollerError> {
        self.scanner_scan_id
            .as_deref()
            .ok_or_else(|| PollerError::MissingScanId {
                job_id: self.job_id.clone(),
            })
    }

    /// Returns the successor of this job after a relaunch.
    pub fn relaunched(&self, new_scan_id: impl Into<String>) -> Self {
        Self {
            job_id: self.job_id.clone(),
            app_id: self.app_id.clone(),
            scanner_scan_id: Some(new_scan_id.into()),
            config: Arc::clone(&self.config),
            relaunch_count: self.relaunch_count + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> ScanJob {
        ScanJob::new(
            "job-1",
            "app-7",
            ScanConfig::new("https://shop.example.com", "profile-3")
                .with_progressive_scan(true)
                .with_auth("auth-9", AuthKind::Selenium),
        )
    }

    #[test]
    fn test_require_scan_id() {
        let pending = job();
        assert!(matches!(
            pending.require_scan_id(),
            Err(PollerError::MissingScanId { .. })
        ));

        let accepted = job().with_scanner_scan_id("1001");
        assert_eq!(accepted.require_scan_id().unwrap(), "1001");
    }

    #[test]
    fn test_relaunched_keeps_identity_and_config() {
        let original = job().with_scanner_scan_id("1001");
        let next = original.relaunched("1002");

        assert_eq!(next.job_id, original.job_id);
        assert_eq!(next.app_id, original.app_id);
        assert_eq!(next.scanner_scan_id.as_deref(), Some("1002"));
        assert_eq!(next.relaunch_count, 1);
        assert!(Arc::ptr_eq(&next.config, &original.config));
    }

    #[test]
    fn test_auth_kind_parse() {
        assert_eq!("standard".parse::<AuthKind>().unwrap(), AuthKind::Standard);
        assert!("oauth".parse::<AuthKind>().is_err());
    }

    #[test]
    fn test_appliance_display() {
        let internal = ApplianceType::Internal {
            appliance_id: "sa-1".into(),
        };
        assert_eq!(internal.to_string(), "INTERNAL(sa-1)");
        assert_eq!(ApplianceType::External.to_string(), "EXTERNAL");
    }
}
