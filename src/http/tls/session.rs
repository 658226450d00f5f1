//! TLS session operations
//!
//! This module implements the SessionOps trait for TLS connections,
//! enabling transparent switching between plain TCP and TLS I/O.

use super::config::{TlsConfig, TlsError};
use super::vars::TlsVars;
use crate::http::session::{poll_fd, PollEvents, SessionOps};
use crate::http::{Error, Result as HttpResult};
use openssl::ssl::{ErrorCode, HandshakeError, MidHandshakeSslStream, Ssl, SslStream};
use std::io::{self, Read, Write};
use std::net::{IpAddr, Shutdown, TcpStream};
use std::os::fd::AsRawFd;
use std::time::{Duration, Instant};

/// TLS session operations
///
/// Implements SessionOps trait for TLS-encrypted connections.
/// Wraps an OpenSSL SslStream and provides poll/read/write/close operations.
pub struct TlsSessionOps {
    stream: SslStream<TcpStream>,
    vars: TlsVars,
    failed: bool,
}

impl TlsSessionOps {
    /// Create a client TLS connection (perform handshake)
    ///
    /// The handshake runs on a non-blocking socket and fails with
    /// `HandshakeTimeout` once `deadline` passes, however the peer paces its
    /// records. The socket is blocking again afterwards.
    pub fn connect(tcp_stream: TcpStream, config: TlsConfig, deadline: Instant) -> Result<Self, TlsError> {
        let mut ssl = Ssl::new(&config.ctx)?;

        // SNI must be a DNS name; IP literals are sent without it
        if let Some(ref servername) = config.servername {
            if servername.parse::<IpAddr>().is_err() {
                ssl.set_hostname(servername)?;
            }
        }

        tcp_stream.set_nonblocking(true)?;
        let ssl_stream = finish_handshake(ssl.connect(tcp_stream), deadline)?;
        ssl_stream.get_ref().set_nonblocking(false)?;
        let vars = TlsVars::from_ssl(ssl_stream.ssl());
        log::debug!("TLS established: {}", vars);

        Ok(TlsSessionOps {
            stream: ssl_stream,
            vars,
            failed: false,
        })
    }

    /// Get the negotiated TLS parameters
    pub fn vars(&self) -> &TlsVars {
        &self.vars
    }

    fn fail(&mut self, e: io::Error) -> Error {
        self.failed = true;
        Error::Io(e)
    }
}

/// Drive a non-blocking handshake to completion or to `deadline`
fn finish_handshake(
    mut attempt: std::result::Result<SslStream<TcpStream>, HandshakeError<TcpStream>>,
    deadline: Instant,
) -> Result<SslStream<TcpStream>, TlsError> {
    loop {
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(HandshakeError::WouldBlock(mid)) => {
                wait_for_peer(&mid, deadline)?;
                attempt = mid.handshake();
            }
            Err(e) => return Err(handshake_error(e)),
        }
    }
}

fn wait_for_peer(mid: &MidHandshakeSslStream<TcpStream>, deadline: Instant) -> Result<(), TlsError> {
    let events = if mid.error().code() == ErrorCode::WANT_WRITE {
        PollEvents::Write
    } else {
        PollEvents::Read
    };

    let left = deadline
        .checked_duration_since(Instant::now())
        .filter(|left| !left.is_zero())
        .ok_or(TlsError::HandshakeTimeout)?;

    match poll_fd(mid.get_ref().as_raw_fd(), events, Some(left)) {
        Ok(true) => Ok(()),
        Ok(false) => Err(TlsError::HandshakeTimeout),
        Err(Error::Io(e)) => Err(TlsError::Io(e)),
        Err(e) => Err(TlsError::HandshakeFailed(e.to_string())),
    }
}

fn handshake_error(err: HandshakeError<TcpStream>) -> TlsError {
    match err {
        HandshakeError::SetupFailure(stack) => TlsError::OpenSsl(stack),
        HandshakeError::WouldBlock(_) => TlsError::HandshakeTimeout,
        HandshakeError::Failure(mid) => {
            let error = mid.error();
            let timed_out = error
                .io_error()
                .map(|e| matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut))
                .unwrap_or(false);
            if timed_out {
                TlsError::HandshakeTimeout
            } else {
                TlsError::HandshakeFailed(error.to_string())
            }
        }
    }
}

impl SessionOps for TlsSessionOps {
    fn poll(&self, events: PollEvents, timeout: Option<Duration>) -> HttpResult<bool> {
        // Decrypted bytes already buffered by OpenSSL won't wake the fd
        if matches!(events, PollEvents::Read | PollEvents::Both) && self.stream.ssl().pending() > 0 {
            return Ok(true);
        }

        poll_fd(self.stream.get_ref().as_raw_fd(), events, timeout)
    }

    fn read(&mut self, buf: &mut [u8]) -> HttpResult<usize> {
        match self.stream.read(buf) {
            Ok(n) => Ok(n),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn write(&mut self, buf: &[u8]) -> HttpResult<usize> {
        match self.stream.write(buf) {
            Ok(n) => Ok(n),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn flush(&mut self) -> HttpResult<()> {
        match self.stream.flush() {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn close(&mut self) -> HttpResult<()> {
        // close_notify only makes sense on a healthy session
        if !self.failed {
            let _ = self.stream.shutdown();
        }

        self.stream
            .get_mut()
            .shutdown(Shutdown::Both)
            .map_err(Error::from)
    }
}
