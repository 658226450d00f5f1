//! Errors raised by the HTTP/2 client
//!
//! `Error` is what our own code reports; `ErrorCode` is the 32-bit code
//! carried in RST_STREAM and GOAWAY frames.

use std::fmt;

/// Failure of an HTTP/2 operation
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(crate::http::Error),

    /// Peer broke framing or stream rules
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// HPACK decoding failed; the connection is unusable afterwards
    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Frame size error: {0}")]
    FrameSize(String),

    #[error("Invalid settings value: {0}")]
    InvalidSettings(String),

    /// Peer sent GOAWAY
    #[error("GOAWAY received: {} (last stream {last_stream_id}){}", code_name(.code), debug_suffix(.debug))]
    GoAway {
        last_stream_id: u32,
        code: u32,
        debug: String,
    },

    /// Peer reset a stream we were waiting on
    #[error("Stream {stream_id} reset by peer: {}", code_name(.code))]
    StreamReset { stream_id: u32, code: u32 },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout")]
    Timeout,

    #[error("Invalid stream ID: {0}")]
    InvalidStreamId(u32),

    #[error("Too many concurrent streams")]
    TooManyStreams,
}

impl From<crate::http::Error> for Error {
    fn from(err: crate::http::Error) -> Self {
        match err {
            crate::http::Error::Timeout => Error::Timeout,
            crate::http::Error::ConnectionClosed => Error::ConnectionClosed,
            crate::http::Error::Io(e) => Error::Io(e),
            other => Error::Http(other),
        }
    }
}

fn code_name(code: &u32) -> String {
    describe_code(*code)
}

fn debug_suffix(debug: &str) -> String {
    if debug.is_empty() {
        String::new()
    } else {
        format!(" \"{}\"", debug)
    }
}

/// Render a wire error code by name, falling back to hex for unknown codes
pub fn describe_code(code: u32) -> String {
    match ErrorCode::from_u32(code) {
        Some(known) => known.to_string(),
        None => format!("UNKNOWN (0x{:x})", code),
    }
}

/// Wire error codes (RFC 7540 Section 7)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    NoError = 0x0,
    ProtocolError = 0x1,
    InternalError = 0x2,
    FlowControlError = 0x3,
    SettingsTimeout = 0x4,
    StreamClosed = 0x5,
    FrameSizeError = 0x6,
    RefusedStream = 0x7,
    /// What the prober sends in its RST_STREAM
    Cancel = 0x8,
    CompressionError = 0x9,
    ConnectError = 0xa,
    /// Peer is rate limiting us; the usual answer to reset floods
    EnhanceYourCalm = 0xb,
    InadequateSecurity = 0xc,
    Http11Required = 0xd,
}

impl ErrorCode {
    /// Convert error code to u32
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Create error code from u32
    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            0x0 => Some(ErrorCode::NoError),
            0x1 => Some(ErrorCode::ProtocolError),
            0x2 => Some(ErrorCode::InternalError),
            0x3 => Some(ErrorCode::FlowControlError),
            0x4 => Some(ErrorCode::SettingsTimeout),
            0x5 => Some(ErrorCode::StreamClosed),
            0x6 => Some(ErrorCode::FrameSizeError),
            0x7 => Some(ErrorCode::RefusedStream),
            0x8 => Some(ErrorCode::Cancel),
            0x9 => Some(ErrorCode::CompressionError),
            0xa => Some(ErrorCode::ConnectError),
            0xb => Some(ErrorCode::EnhanceYourCalm),
            0xc => Some(ErrorCode::InadequateSecurity),
            0xd => Some(ErrorCode::Http11Required),
            _ => None,
        }
    }

    /// Get error name
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCode::NoError => "NO_ERROR",
            ErrorCode::ProtocolError => "PROTOCOL_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::FlowControlError => "FLOW_CONTROL_ERROR",
            ErrorCode::SettingsTimeout => "SETTINGS_TIMEOUT",
            ErrorCode::StreamClosed => "STREAM_CLOSED",
            ErrorCode::FrameSizeError => "FRAME_SIZE_ERROR",
            ErrorCode::RefusedStream => "REFUSED_STREAM",
            ErrorCode::Cancel => "CANCEL",
            ErrorCode::CompressionError => "COMPRESSION_ERROR",
            ErrorCode::ConnectError => "CONNECT_ERROR",
            ErrorCode::EnhanceYourCalm => "ENHANCE_YOUR_CALM",
            ErrorCode::InadequateSecurity => "INADEQUATE_SECURITY",
            ErrorCode::Http11Required => "HTTP_1_1_REQUIRED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:x})", self.name(), self.as_u32())
    }
}

/// Result type for HTTP/2 operations
pub type Result<T> = std::result::Result<T, Error>;
