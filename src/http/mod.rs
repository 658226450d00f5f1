//! HTTP transport layer for the probes
//!
//! This module provides the plumbing the probes speak through: a session
//! abstraction over plain TCP and TLS, a minimal HTTP/1.x client used to
//! observe downgrades and drive `h2c` upgrades, and a low-level HTTP/2 client.
//!
//! # Architecture
//!
//! The HTTP layer uses a session operations abstraction pattern that allows
//! seamless switching between plain TCP and TLS connections:
//!
//! - `SessionOps` trait defines operations (poll, read, write, close)
//! - `HttpSession` adds timeouts and a push-back buffer on top of a transport
//! - All HTTP and HTTP/2 I/O code is transparent to the underlying transport
//!
//! # Examples
//!
//! ```no_run
//! use rrscan::http::{HttpClient, HttpRequest};
//! use rrscan::http::session::FdSessionOps;
//! use std::net::TcpStream;
//!
//! let stream = TcpStream::connect("127.0.0.1:8080").unwrap();
//! let mut client = HttpClient::new(FdSessionOps::new(stream));
//!
//! let request = HttpRequest::get("/").header("Host", "localhost").build();
//! client.send_request(&request).unwrap();
//!
//! let head = client.receive_head().unwrap();
//! println!("{} {}", head.version(), head.status());
//! ```

pub mod client;
pub mod headers;
pub mod message;
pub mod session;
pub mod h2;
pub mod tls;

pub use client::HttpClient;
pub use headers::Headers;
pub use message::{HttpRequest, Method, ResponseHead, Status, Version};
pub use session::{HttpSession, PollEvents, SessionOps};

/// Result type for HTTP operations
pub type Result<T> = std::result::Result<T, Error>;

/// HTTP operation errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid HTTP version: {0}")]
    InvalidVersion(String),

    #[error("Invalid HTTP status: {0}")]
    InvalidStatus(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Response head exceeds {0} bytes")]
    HeadTooLarge(usize),

    #[error("Timeout")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,
}

/// Maximum number of headers per message
pub const MAX_HEADERS: usize = 64;

/// Maximum size of a response head (status line plus headers)
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Default HTTP port
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// Default HTTPS port
pub const DEFAULT_HTTPS_PORT: u16 = 443;

/// CRLF line ending
pub const CRLF: &str = "\r\n";

/// User-Agent sent with every probe request
pub const USER_AGENT: &str = concat!("rrscan/", env!("CARGO_PKG_VERSION"));
