//! HTTP/1.x client
//!
//! Just enough HTTP/1.1 for the probes: write a request, read a response head
//! and optionally a bounded body. Any bytes read past the head stay available
//! to whoever takes over the session (see `into_session`).

use super::{Error, HttpRequest, HttpSession, ResponseHead, Result, SessionOps};
use bytes::{Buf, Bytes, BytesMut};
use std::time::{Duration, Instant};

/// Largest body `read_body` will buffer
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// HTTP client
///
/// Provides methods for sending requests and receiving responses.
pub struct HttpClient<S: SessionOps> {
    session: HttpSession<S>,
    buffer: BytesMut,
}

impl<S: SessionOps> HttpClient<S> {
    /// Create a new HTTP client with a session
    pub fn new(session: S) -> Self {
        Self::from_session(HttpSession::new(session))
    }

    /// Create a client on top of an existing HTTP session
    pub fn from_session(session: HttpSession<S>) -> Self {
        HttpClient {
            session,
            buffer: BytesMut::with_capacity(8192),
        }
    }

    /// Set the timeout for operations
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.session.set_timeout(Some(timeout));
    }

    /// Bound the whole exchange, however many reads it takes
    pub fn set_deadline(&mut self, deadline: Instant) {
        self.session.set_deadline(Some(deadline));
    }

    /// Send an HTTP request
    pub fn send_request(&mut self, request: &HttpRequest) -> Result<()> {
        log::trace!("-> {} {}", request.method(), request.target());
        self.session.write_all(&request.to_wire())
    }

    /// Receive a response head
    ///
    /// Bytes following the head are kept for `read_body` / `into_session`.
    pub fn receive_head(&mut self) -> Result<ResponseHead> {
        loop {
            if let Some((head, consumed)) = ResponseHead::parse(&self.buffer)? {
                self.buffer.advance(consumed);
                log::trace!("<- {} {}", head.version(), head.status());
                return Ok(head);
            }

            if self.fill()? == 0 {
                return Err(Error::ConnectionClosed);
            }
        }
    }

    /// Read the body that follows `head`, up to `MAX_BODY_SIZE`
    ///
    /// Uses `Content-Length` when present, otherwise reads until the server
    /// closes the connection.
    pub fn read_body(&mut self, head: &ResponseHead) -> Result<Bytes> {
        let wanted = head.headers().content_length();
        let limit = wanted.unwrap_or(MAX_BODY_SIZE).min(MAX_BODY_SIZE);

        while self.buffer.len() < limit {
            if self.fill()? == 0 {
                if wanted.is_some() {
                    return Err(Error::ConnectionClosed);
                }
                break;
            }
        }

        let take = self.buffer.len().min(limit);
        Ok(self.buffer.split_to(take).freeze())
    }

    /// Hand the session back, returning unconsumed bytes to it first
    pub fn into_session(mut self) -> HttpSession<S> {
        self.session.unread(&self.buffer);
        self.session
    }

    /// Close the underlying session
    pub fn close(&mut self) -> Result<()> {
        self.session.close()
    }

    fn fill(&mut self) -> Result<usize> {
        let mut temp = [0u8; 4096];
        let n = self.session.read(&mut temp)?;
        self.buffer.extend_from_slice(&temp[..n]);
        Ok(n)
    }
}
