//! Scan targets

use super::ProbeError;
use crate::http::{DEFAULT_HTTPS_PORT, DEFAULT_HTTP_PORT};
use crate::net::{format_authority, ProxyEndpoint};
use std::fmt;
use url::Url;

/// URL scheme of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => DEFAULT_HTTP_PORT,
            Scheme::Https => DEFAULT_HTTPS_PORT,
        }
    }
}

/// One URL to probe, with the proxy its connections go through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    url: String,
    scheme: Scheme,
    host: String,
    port: u16,
    path: String,
    proxy: Option<ProxyEndpoint>,
}

impl ScanTarget {
    /// Parse an `http://` or `https://` URL
    ///
    /// The request target keeps the query string; the fragment is dropped.
    pub fn parse(input: &str) -> Result<Self, ProbeError> {
        let input = input.trim();
        let url = Url::parse(input).map_err(|e| ProbeError::InvalidTarget(format!("{:?}: {}", input, e)))?;

        let scheme = match url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => {
                return Err(ProbeError::InvalidTarget(format!(
                    "{:?}: unsupported scheme {:?}",
                    input, other
                )))
            }
        };

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ProbeError::InvalidTarget(format!("{:?}: missing host", input)))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();

        let port = url.port().unwrap_or_else(|| scheme.default_port());

        let mut path = match url.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        Ok(ScanTarget {
            url: input.to_string(),
            scheme,
            host,
            port,
            path,
            proxy: None,
        })
    }

    /// Route this target's connections through `proxy`
    pub fn with_proxy(mut self, proxy: Option<ProxyEndpoint>) -> Self {
        self.proxy = proxy;
        self
    }

    /// The URL as given
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Host name or address, IPv6 without brackets
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Path plus query, never empty
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn proxy(&self) -> Option<&ProxyEndpoint> {
        self.proxy.as_ref()
    }

    /// `Host` / `:authority` value; the port is omitted when it is the default
    pub fn authority(&self) -> String {
        if self.port == self.scheme.default_port() {
            if self.host.contains(':') {
                format!("[{}]", self.host)
            } else {
                self.host.clone()
            }
        } else {
            format_authority(&self.host, self.port)
        }
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}
