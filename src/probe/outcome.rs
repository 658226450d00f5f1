//! Probe outcomes and scan results

use crate::http::h2::ErrorCode;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// What the Protocol Negotiator observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationOutcome {
    /// The response came back over HTTP/2
    NegotiatedH2,
    /// The server answered with an older HTTP version, e.g. `HTTP/1.1`
    Downgraded(String),
    /// No usable answer; the detail says why
    ConnectionError(String),
}

impl fmt::Display for NegotiationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationOutcome::NegotiatedH2 => f.write_str("negotiated HTTP/2"),
            NegotiationOutcome::Downgraded(version) => write!(f, "downgraded to {}", version),
            NegotiationOutcome::ConnectionError(detail) => write!(f, "connection error ({})", detail),
        }
    }
}

/// Why the server did not quietly accept the reset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub detail: String,
    /// Error code of a GOAWAY sent in answer to the reset
    pub mitigation: Option<ErrorCode>,
}

impl Rejection {
    /// Rejection without an explicit server signal
    pub fn new(detail: impl Into<String>) -> Self {
        Rejection {
            detail: detail.into(),
            mitigation: None,
        }
    }

    /// Rejection signalled by a GOAWAY carrying `code`
    pub fn goaway(detail: impl Into<String>, code: Option<ErrorCode>) -> Self {
        Rejection {
            detail: detail.into(),
            mitigation: code,
        }
    }

    /// The server told us to slow down
    pub fn is_rate_limit(&self) -> bool {
        self.mitigation == Some(ErrorCode::EnhanceYourCalm)
    }
}

/// What the Stream Reset Prober observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    ResetAccepted,
    ResetRejected(Rejection),
    NotAttempted,
}

impl fmt::Display for ResetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetOutcome::ResetAccepted => f.write_str("reset accepted"),
            ResetOutcome::ResetRejected(rejection) => write!(f, "reset rejected ({})", rejection.detail),
            ResetOutcome::NotAttempted => f.write_str("reset not attempted"),
        }
    }
}

/// Final verdict for one target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VulnerabilityStatus {
    Vulnerable,
    Likely,
    Possible,
    Safe,
    Error,
}

impl VulnerabilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VulnerabilityStatus::Vulnerable => "VULNERABLE",
            VulnerabilityStatus::Likely => "LIKELY",
            VulnerabilityStatus::Possible => "POSSIBLE",
            VulnerabilityStatus::Safe => "SAFE",
            VulnerabilityStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for VulnerabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VulnerabilityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VULNERABLE" => Ok(VulnerabilityStatus::Vulnerable),
            "LIKELY" => Ok(VulnerabilityStatus::Likely),
            "POSSIBLE" => Ok(VulnerabilityStatus::Possible),
            "SAFE" => Ok(VulnerabilityStatus::Safe),
            "ERROR" => Ok(VulnerabilityStatus::Error),
            other => Err(format!("unknown status {:?}", other)),
        }
    }
}

/// One row of scan output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// When the scan of this target started
    pub timestamp: DateTime<Local>,
    pub source_internal_ip: Option<IpAddr>,
    pub source_external_ip: Option<IpAddr>,
    pub url: String,
    pub status: VulnerabilityStatus,
    /// Downgrade version, error text or rejection reason; empty for VULNERABLE
    pub detail: String,
}
