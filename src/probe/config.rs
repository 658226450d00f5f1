//! Scan configuration

use crate::net::ProxyEndpoint;
use std::time::Duration;

/// Per-step I/O bound when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Worker threads for batch scans when none is configured
pub const DEFAULT_WORKERS: usize = 8;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid proxy: {0}")]
    InvalidProxy(String),

    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    #[error("at least one worker is required")]
    NoWorkers,
}

/// Settings shared by every target of a scan
#[derive(Debug, Clone)]
pub struct ScanConfig {
    proxy: Option<ProxyEndpoint>,
    timeout: Duration,
    workers: usize,
}

impl ScanConfig {
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Proxy every connection goes through, if any
    pub fn proxy(&self) -> Option<&ProxyEndpoint> {
        self.proxy.as_ref()
    }

    /// Bound applied to each connect, handshake, read and write
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            proxy: None,
            timeout: DEFAULT_TIMEOUT,
            workers: DEFAULT_WORKERS,
        }
    }
}

/// Builder for [`ScanConfig`]
///
/// Validation happens in [`build`](ScanConfigBuilder::build) so that the
/// setters can be chained straight from command line values.
#[derive(Debug, Default)]
pub struct ScanConfigBuilder {
    proxy: Option<String>,
    timeout: Option<Duration>,
    workers: Option<usize>,
}

impl ScanConfigBuilder {
    /// Proxy URL, `http://host:port`
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn build(self) -> Result<ScanConfig, ConfigError> {
        let proxy = self
            .proxy
            .map(|p| ProxyEndpoint::parse(&p).map_err(|e| ConfigError::InvalidProxy(e.to_string())))
            .transpose()?;

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        let workers = self.workers.unwrap_or(DEFAULT_WORKERS);
        if workers == 0 {
            return Err(ConfigError::NoWorkers);
        }

        Ok(ScanConfig {
            proxy,
            timeout,
            workers,
        })
    }
}
