//! HTTP/1.x message types
//!
//! Requests are only ever built and written; responses are only ever read up
//! to the end of their head. The status line version is what the negotiator
//! reports when a server declines HTTP/2.

use super::{Error, Headers, Result, CRLF, MAX_HEAD_SIZE};
use std::fmt;

/// HTTP methods used by the probes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Connect,
}

impl Method {
    /// Convert method to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Connect => "CONNECT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// HTTP protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Version {
    Http10,
    #[default]
    Http11,
    Http2,
}

impl Version {
    /// Parse version from a status line token
    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "HTTP/1.0" => Ok(Version::Http10),
            "HTTP/1.1" => Ok(Version::Http11),
            "HTTP/2" | "HTTP/2.0" => Ok(Version::Http2),
            _ => Err(Error::InvalidVersion(s.to_string())),
        }
    }

    /// Convert version to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
            Version::Http2 => "HTTP/2",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// HTTP status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status {
    code: u16,
}

impl Status {
    /// Create a new status code
    pub fn new(code: u16) -> Result<Self> {
        if (100..600).contains(&code) {
            Ok(Status { code })
        } else {
            Err(Error::InvalidStatus(format!("Invalid status code: {}", code)))
        }
    }

    /// Get the status code
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Check if this is an informational status (1xx)
    pub fn is_informational(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// Check if this is a success status (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub const SWITCHING_PROTOCOLS: Status = Status { code: 101 };
    pub const OK: Status = Status { code: 200 };
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

/// HTTP/1.1 request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    target: String,
    headers: Headers,
}

impl HttpRequest {
    /// Start building a GET request for `target`
    pub fn get(target: impl Into<String>) -> HttpRequestBuilder {
        HttpRequestBuilder::new(Method::Get, target)
    }

    /// Start building a CONNECT request for `authority` (`host:port`)
    pub fn connect(authority: impl Into<String>) -> HttpRequestBuilder {
        HttpRequestBuilder::new(Method::Connect, authority)
    }

    /// Get the method
    pub fn method(&self) -> Method {
        self.method
    }

    /// Get the request target
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Get the headers
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Convert the request to wire format
    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);

        buf.extend_from_slice(self.method.as_str().as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.target.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(Version::Http11.as_str().as_bytes());
        buf.extend_from_slice(CRLF.as_bytes());

        self.headers.write_wire(&mut buf);
        buf.extend_from_slice(CRLF.as_bytes());

        buf
    }
}

/// Builder for HTTP requests
#[derive(Debug)]
pub struct HttpRequestBuilder {
    method: Method,
    target: String,
    headers: Headers,
}

impl HttpRequestBuilder {
    fn new(method: Method, target: impl Into<String>) -> Self {
        HttpRequestBuilder {
            method,
            target: target.into(),
            headers: Headers::new(),
        }
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Build the request
    pub fn build(self) -> HttpRequest {
        HttpRequest {
            method: self.method,
            target: self.target,
            headers: self.headers,
        }
    }
}

/// Status line and headers of an HTTP/1.x response
#[derive(Debug, Clone)]
pub struct ResponseHead {
    version: Version,
    status: Status,
    reason: String,
    headers: Headers,
}

impl ResponseHead {
    /// Get the protocol version from the status line
    pub fn version(&self) -> Version {
        self.version
    }

    /// Get the status code
    pub fn status(&self) -> Status {
        self.status
    }

    /// Get the reason phrase as sent by the server
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Get the headers
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Whether this response accepts an `Upgrade: h2c` request
    pub fn is_h2c_upgrade(&self) -> bool {
        self.status == Status::SWITCHING_PROTOCOLS && self.headers.has_token("Upgrade", "h2c")
    }

    /// Try to parse a response head from the start of `buf`
    ///
    /// Returns `Ok(None)` while the blank line terminating the head has not
    /// arrived yet, otherwise the head and the number of bytes it occupied.
    pub fn parse(buf: &[u8]) -> Result<Option<(ResponseHead, usize)>> {
        let end = match find_head_end(buf) {
            Some(end) => end,
            None if buf.len() > MAX_HEAD_SIZE => return Err(Error::HeadTooLarge(MAX_HEAD_SIZE)),
            None => return Ok(None),
        };

        let text = String::from_utf8_lossy(&buf[..end]);
        let mut lines = text.split(CRLF);

        let status_line = lines
            .next()
            .ok_or_else(|| Error::Parse("Empty response head".to_string()))?;
        let (version, status, reason) = parse_status_line(status_line)?;

        let mut headers = Headers::new();
        for line in lines.filter(|l| !l.is_empty()) {
            let (name, value) = Headers::parse_header_line(line)?;
            headers.insert(name, value);
        }

        Ok(Some((
            ResponseHead {
                version,
                status,
                reason,
                headers,
            },
            end + 4,
        )))
    }
}

/// Position of the `\r\n\r\n` that ends a message head
fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Parse HTTP response status line
///
/// Format: VERSION STATUS REASON
/// Example: HTTP/1.1 200 OK
pub fn parse_status_line(line: &str) -> Result<(Version, Status, String)> {
    let parts: Vec<&str> = line.splitn(3, ' ').collect();

    if parts.len() < 2 {
        return Err(Error::Parse(format!(
            "Invalid status line: {:?}",
            line
        )));
    }

    let version = Version::from_str(parts[0])?;
    let code = parts[1]
        .parse::<u16>()
        .map_err(|_| Error::InvalidStatus(parts[1].to_string()))?;
    let status = Status::new(code)?;
    let reason = parts.get(2).map(|r| r.to_string()).unwrap_or_default();

    Ok((version, status, reason))
}
