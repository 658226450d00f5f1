//! HTTP/2 protocol implementation
//!
//! A client-only HTTP/2 implementation with frame-level control, built for
//! probing servers rather than for fetching content.
//!
//! # Architecture
//!
//! Frames are encoded and decoded by hand (`codec`, `frames`) and header
//! blocks go through the `hpack` crate. `H2Client` sits on top of any
//! `SessionOps` transport and exposes the individual protocol steps: the
//! preface exchange, opening a stream with HEADERS, cancelling it with
//! RST_STREAM, and a PING round trip. Connection-level frames (SETTINGS,
//! PING, GOAWAY) are handled while the client waits.
//!
//! Cleartext connections reach HTTP/2 through the `Upgrade: h2c` handshake
//! in `upgrade`.
//!
//! # Examples
//!
//! ```no_run
//! use rrscan::http::h2::{ErrorCode, H2ClientBuilder};
//! use rrscan::http::tls::TlsConfig;
//! use std::net::TcpStream;
//! use std::time::{Duration, Instant};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tls_config = TlsConfig::client()?
//!     .alpn(&["h2"])?
//!     .servername("example.com")
//!     .build()?;
//!
//! let tcp_stream = TcpStream::connect("example.com:443")?;
//! let tls_session = tls_config.connect(tcp_stream, Instant::now() + Duration::from_secs(5))?;
//!
//! let mut client = H2ClientBuilder::new()
//!     .authority("example.com")
//!     .build(tls_session)?;
//!
//! let stream_id = client.send_request_headers("GET", "/", true)?;
//! client.send_rst_stream(stream_id, ErrorCode::Cancel)?;
//! client.ping(*b"rrscan\0\0")?;
//! client.close()?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod error;
pub mod frames;
pub mod settings;
pub mod stream;
pub mod upgrade;

pub use client::{H2Client, H2ClientBuilder, H2Response};
pub use codec::FrameCodec;
pub use error::{Error, ErrorCode, Result};
pub use frames::{Frame, FrameFlags, FrameType, GoawayFrame, HeadersFrame, PingFrame, RstStreamFrame, SettingsFrame};
pub use settings::Settings;
pub use stream::{StreamId, StreamState};
pub use upgrade::{upgrade, Upgrade};

/// HTTP/2 connection preface that must be sent by clients
///
/// From RFC 7540 Section 3.5:
/// "PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n"
pub const CONNECTION_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// Default initial window size (65535 bytes)
pub const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 65535;

/// Default maximum frame size (16384 bytes)
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16384;

/// Default header table size (4096 bytes)
pub const DEFAULT_HEADER_TABLE_SIZE: u32 = 4096;

/// Maximum stream ID value (2^31 - 1)
pub const MAX_STREAM_ID: u32 = 0x7FFFFFFF;

/// Stream ID 0 (connection-level)
pub const CONNECTION_STREAM_ID: u32 = 0;
