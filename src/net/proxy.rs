//! HTTP CONNECT proxy tunnelling

use super::{format_authority, Error, Result};
use crate::http::session::FdSessionOps;
use crate::http::{self, HttpClient, HttpRequest, USER_AGENT};
use std::fmt;
use std::net::TcpStream;
use std::time::{Duration, Instant};
use url::Url;

/// An HTTP proxy that accepts `CONNECT host:port`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    host: String,
    port: u16,
}

impl ProxyEndpoint {
    /// Parse `http://host:port`; the port defaults to 80
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input).map_err(|e| Error::Proxy(format!("invalid proxy URL {:?}: {}", input, e)))?;

        if url.scheme() != "http" {
            return Err(Error::Proxy(format!(
                "unsupported proxy scheme {:?} (only http CONNECT proxies are supported)",
                url.scheme()
            )));
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::Proxy(format!("proxy URL {:?} has no host", input)))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();

        let port = url
            .port_or_known_default()
            .ok_or_else(|| Error::Proxy(format!("proxy URL {:?} has no port", input)))?;

        Ok(ProxyEndpoint { host, port })
    }

    /// Proxy host name or address
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Proxy port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Ask the proxy, already connected on `stream`, for a tunnel
    ///
    /// Any 2xx answer opens the tunnel; the stream is handed back ready for
    /// the target's own protocol.
    pub fn tunnel(&self, stream: TcpStream, host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
        let authority = format_authority(host, port);

        let mut client = HttpClient::new(FdSessionOps::new(stream));
        client.set_timeout(timeout);
        client.set_deadline(Instant::now() + timeout);

        let request = HttpRequest::connect(authority.as_str())
            .header("Host", authority.as_str())
            .header("User-Agent", USER_AGENT)
            .build();

        let head = client
            .send_request(&request)
            .and_then(|_| client.receive_head())
            .map_err(|e| match e {
                http::Error::Timeout => Error::Timeout(format!("waiting for proxy {} to answer CONNECT", self)),
                other => Error::Proxy(format!("CONNECT {} via {} failed: {}", authority, self, other)),
            })?;

        if !head.status().is_success() {
            return Err(Error::Proxy(format!(
                "CONNECT {} refused by {}: {} {}",
                authority,
                self,
                head.status(),
                head.reason()
            )));
        }

        let (ops, leftover) = client.into_session().into_inner();
        if !leftover.is_empty() {
            return Err(Error::Proxy(format!(
                "{} sent {} unexpected bytes after CONNECT response",
                self,
                leftover.len()
            )));
        }

        log::debug!("tunnel to {} open via {}", authority, self);
        Ok(ops.into_inner())
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http://{}", format_authority(&self.host, self.port))
    }
}
