//! Rapid Reset probe engine
//!
//! Two probes and a decision table:
//!
//! 1. [`negotiate`] connects offering HTTP/2 and reports whether the
//!    response came back over it, was downgraded, or never arrived.
//! 2. [`probe_reset`] runs only for HTTP/2 targets. It opens one stream,
//!    cancels it at once and checks that the connection is still healthy.
//! 3. [`classify`] turns the pair of outcomes into a [`VulnerabilityStatus`].
//!
//! [`Scanner`] ties them together for one URL or a batch.
//!
//! # Example
//!
//! ```no_run
//! use rrscan::probe::{ScanConfig, Scanner};
//! use rrscan::source::SourceAddrs;
//!
//! let config = ScanConfig::builder().build().unwrap();
//! let scanner = Scanner::new(config, SourceAddrs::unknown());
//!
//! let result = scanner.scan_target("https://example.com/");
//! println!("{} {} {}", result.url, result.status, result.detail);
//! ```

pub mod classify;
pub mod config;
pub mod connect;
pub mod error;
pub mod negotiate;
pub mod outcome;
pub mod reset;
pub mod scanner;
pub mod target;

pub use classify::classify;
pub use config::{ConfigError, ScanConfig, ScanConfigBuilder, DEFAULT_TIMEOUT, DEFAULT_WORKERS};
pub use error::ProbeError;
pub use negotiate::negotiate;
pub use outcome::{NegotiationOutcome, Rejection, ResetOutcome, ScanResult, VulnerabilityStatus};
pub use reset::{probe_reset, PROBE_PING};
pub use scanner::Scanner;
pub use target::{ScanTarget, Scheme};
