//! TLS support for probe connections
//!
//! This module implements the client side of TLS on top of OpenSSL. The
//! handshake offers ALPN so the negotiator can learn, before a single HTTP
//! byte is sent, whether the server is willing to speak HTTP/2.
//!
//! # Architecture
//!
//! The TLS implementation uses the session operations abstraction pattern:
//!
//! 1. `TlsConfig` defines the client settings (ALPN, SNI, verification)
//! 2. `TlsSessionOps` implements the `SessionOps` trait for encrypted I/O
//! 3. All HTTP code remains unchanged - it transparently uses TLS operations
//!
//! # Examples
//!
//! ```no_run
//! use rrscan::http::tls::TlsConfig;
//! use std::net::TcpStream;
//! use std::time::{Duration, Instant};
//!
//! let tls_config = TlsConfig::client()
//!     .unwrap()
//!     .alpn(&["h2", "http/1.1"])
//!     .unwrap()
//!     .servername("example.com")
//!     .build()
//!     .unwrap();
//!
//! let tcp_stream = TcpStream::connect("example.com:443").unwrap();
//! let tls_session = tls_config
//!     .connect(tcp_stream, Instant::now() + Duration::from_secs(5))
//!     .unwrap();
//! println!("server picked {:?}", tls_session.vars().alpn);
//! ```

pub mod config;
pub mod session;
pub mod vars;

pub use config::{ClientConfigBuilder, TlsConfig, TlsError};
pub use session::TlsSessionOps;
pub use vars::{TlsVars, ALPN_H2, ALPN_HTTP11};

/// Result type for TLS operations
pub type Result<T> = std::result::Result<T, TlsError>;
