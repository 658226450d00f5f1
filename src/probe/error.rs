//! Probe error taxonomy
//!
//! Every layer below the probes has its own error enum. They all collapse
//! into `ProbeError`, whose display text (category prefix plus cause) is what
//! ends up in a result's detail column.

use crate::http;
use crate::http::h2;
use crate::http::tls::TlsError;
use crate::net;
use std::io;

/// Why a probe step failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("connection failure: {0}")]
    ConnectionFailure(String),

    #[error("handshake failure: {0}")]
    HandshakeFailure(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("unexpected state: {0}")]
    UnexpectedState(String),

    #[error("invalid target: {0}")]
    InvalidTarget(String),
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

impl From<io::Error> for ProbeError {
    fn from(err: io::Error) -> Self {
        if is_timeout(&err) {
            ProbeError::Timeout(err.to_string())
        } else {
            ProbeError::ConnectionFailure(err.to_string())
        }
    }
}

impl From<net::Error> for ProbeError {
    fn from(err: net::Error) -> Self {
        match err {
            net::Error::Timeout(_) => ProbeError::Timeout(err.to_string()),
            other => ProbeError::ConnectionFailure(other.to_string()),
        }
    }
}

impl From<http::Error> for ProbeError {
    fn from(err: http::Error) -> Self {
        match err {
            http::Error::Timeout => ProbeError::Timeout("no response before the deadline".to_string()),
            http::Error::ConnectionClosed => {
                ProbeError::ConnectionFailure("connection closed by peer".to_string())
            }
            http::Error::Io(e) => ProbeError::from(e),
            other => ProbeError::ProtocolViolation(other.to_string()),
        }
    }
}

impl From<h2::Error> for ProbeError {
    fn from(err: h2::Error) -> Self {
        match err {
            h2::Error::Timeout => ProbeError::Timeout("no response before the deadline".to_string()),
            h2::Error::ConnectionClosed => {
                ProbeError::ConnectionFailure("connection closed by peer".to_string())
            }
            h2::Error::Io(e) => ProbeError::from(e),
            h2::Error::Http(e) => ProbeError::from(e),
            other => ProbeError::ProtocolViolation(other.to_string()),
        }
    }
}

impl From<TlsError> for ProbeError {
    fn from(err: TlsError) -> Self {
        match err {
            TlsError::HandshakeTimeout => ProbeError::Timeout("TLS handshake timed out".to_string()),
            TlsError::Io(e) => ProbeError::from(e),
            other => ProbeError::HandshakeFailure(other.to_string()),
        }
    }
}
