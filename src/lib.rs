//! rrscan - HTTP/2 Rapid Reset (CVE-2023-44487) exposure scanner
//!
//! This crate probes HTTP servers for the behaviour rapid-reset floods
//! exploit, without flooding anything: at most a couple of requests and one
//! cancelled stream per target.

pub mod http;
pub mod net;
pub mod probe;
pub mod report;
pub mod source;

pub use probe::{ScanConfig, ScanResult, Scanner, VulnerabilityStatus};
pub use source::SourceAddrs;
