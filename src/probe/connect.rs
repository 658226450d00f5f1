//! Opening probe connections
//!
//! Both probes reach a target the same way: TCP (through the proxy when one
//! is configured), then TLS offering `h2` and `http/1.1` for `https`, or the
//! `Upgrade: h2c` dance for `http`. What comes back is either a ready HTTP/2
//! client or the HTTP/1.x version the server insisted on.
//!
//! `timeout` bounds each single wait; `deadline` bounds the probe as a whole,
//! from the TCP connect to the last frame read on the returned connection.

use super::{ProbeError, Scheme, ScanTarget};
use crate::http::h2::{self, H2Client, H2ClientBuilder, Upgrade};
use crate::http::session::FdSessionOps;
use crate::http::tls::{TlsConfig, TlsSessionOps, ALPN_H2, ALPN_HTTP11};
use crate::http::{HttpClient, HttpRequest, HttpSession, SessionOps, Version, USER_AGENT};
use crate::net;
use std::time::{Duration, Instant};

/// An HTTP/2 connection, whichever way it was reached
pub enum H2Connection {
    /// TLS with `h2` selected by ALPN; no stream opened yet
    Tls(H2Client<TlsSessionOps>),
    /// Cleartext after `101 Switching Protocols`; stream 1 carries the
    /// upgrade request and its response is still pending
    Upgraded(H2Client<FdSessionOps>),
}

/// Where a connection attempt ended up
pub enum Opened {
    H2(H2Connection),
    /// The server answered over HTTP/1.x; the connection is already closed
    Http1(Version),
}

/// Close an HTTP/2 client, logging instead of failing
pub(crate) fn close_h2<S: SessionOps>(client: &mut H2Client<S>) {
    if let Err(e) = client.close() {
        log::trace!("closing HTTP/2 connection: {}", e);
    }
}

/// Time left before `deadline`, never more than `timeout`
fn budget(timeout: Duration, deadline: Instant) -> Result<Duration, ProbeError> {
    match deadline.checked_duration_since(Instant::now()) {
        Some(left) if !left.is_zero() => Ok(left.min(timeout)),
        _ => Err(ProbeError::Timeout("no response before the deadline".to_string())),
    }
}

fn h2_builder(target: &ScanTarget, timeout: Duration, deadline: Instant) -> H2ClientBuilder {
    H2ClientBuilder::new()
        .authority(target.authority())
        .scheme(target.scheme().as_str())
        .timeout(timeout)
        .deadline(deadline)
}

fn tls_connect(target: &ScanTarget, timeout: Duration, deadline: Instant) -> Result<TlsSessionOps, ProbeError> {
    let wait = budget(timeout, deadline)?;
    let stream = net::open_stream(target.host(), target.port(), target.proxy(), wait)?;

    let config = TlsConfig::client()?
        .alpn(&[ALPN_H2, ALPN_HTTP11])?
        .servername(target.host())
        .verify_peer(false)
        .build()?;

    Ok(config.connect(stream, deadline)?)
}

/// Send a plain `GET` and report the version the server answered with
fn http1_version<S: SessionOps>(
    session: S,
    target: &ScanTarget,
    timeout: Duration,
    deadline: Instant,
) -> Result<Version, ProbeError> {
    let mut client = HttpClient::new(session);
    client.set_timeout(timeout);
    client.set_deadline(deadline);

    let request = HttpRequest::get(target.path())
        .header("Host", target.authority())
        .header("User-Agent", USER_AGENT)
        .header("Connection", "close")
        .build();

    let result = client.send_request(&request).and_then(|_| client.receive_head());
    if let Err(e) = client.close() {
        log::trace!("closing HTTP/1 connection: {}", e);
    }

    let head = result?;
    log::debug!("{} answered {} {}", target, head.version(), head.status());
    Ok(head.version())
}

/// Connect to `target` and get as far as HTTP/2 will take us by `deadline`
pub fn open(target: &ScanTarget, timeout: Duration, deadline: Instant) -> Result<Opened, ProbeError> {
    match target.scheme() {
        Scheme::Https => {
            let tls = tls_connect(target, timeout, deadline)?;
            if tls.vars().negotiated_h2() {
                let mut client = h2_builder(target, timeout, deadline).build(tls)?;
                if let Err(e) = client.connect() {
                    close_h2(&mut client);
                    return Err(e.into());
                }
                Ok(Opened::H2(H2Connection::Tls(client)))
            } else {
                log::debug!("{}: ALPN selected {}", target, tls.vars().alpn.as_deref().unwrap_or("nothing"));
                Ok(Opened::Http1(http1_version(tls, target, timeout, deadline)?))
            }
        }
        Scheme::Http => {
            let wait = budget(timeout, deadline)?;
            let stream = net::open_stream(target.host(), target.port(), target.proxy(), wait)?;
            let mut session = HttpSession::new(FdSessionOps::new(stream));
            session.set_timeout(Some(timeout));
            session.set_deadline(Some(deadline));

            let builder = h2_builder(target, timeout, deadline);
            match h2::upgrade(session, &target.authority(), target.path(), builder)? {
                Upgrade::Switched(client) => Ok(Opened::H2(H2Connection::Upgraded(client))),
                Upgrade::Refused(head) => Ok(Opened::Http1(head.version())),
            }
        }
    }
}
