//! Stream Reset Prober
//!
//! Opens one request stream, cancels it straight away with
//! `RST_STREAM(CANCEL)` and then pings the server. A PING ACK on a still
//! healthy connection means the reset was absorbed silently, which is the
//! behaviour rapid-reset floods rely on.

use super::connect::{self, close_h2, H2Connection, Opened};
use super::{ProbeError, Rejection, ResetOutcome, ScanTarget};
use crate::http::h2::{self, ErrorCode, H2Client};
use crate::http::SessionOps;
use std::time::{Duration, Instant};

/// Opaque payload of the probe's PING
pub const PROBE_PING: [u8; 8] = *b"rrscan\x00\x01";

/// Cancel one stream on a fresh HTTP/2 connection to `target`
///
/// Only meaningful after negotiation found HTTP/2. Never fails: every way
/// the attempt can go wrong is a `ResetRejected` with the reason. The whole
/// attempt, connection setup included, ends within `timeout`.
pub fn probe_reset(target: &ScanTarget, timeout: Duration) -> ResetOutcome {
    let deadline = Instant::now() + timeout;
    let outcome = match connect::open(target, timeout, deadline) {
        Ok(Opened::H2(H2Connection::Tls(client))) => cancel_and_ping(client, target.path(), timeout),
        Ok(Opened::H2(H2Connection::Upgraded(client))) => cancel_and_ping(client, target.path(), timeout),
        Ok(Opened::Http1(version)) => ResetOutcome::ResetRejected(Rejection::new(format!(
            "could not open HTTP/2 connection: server answered {}",
            version
        ))),
        Err(e) => ResetOutcome::ResetRejected(Rejection::new(format!(
            "could not open HTTP/2 connection: {}",
            e
        ))),
    };

    log::debug!("{}: {}", target, outcome);
    outcome
}

fn cancel_and_ping<S: SessionOps>(mut client: H2Client<S>, path: &str, timeout: Duration) -> ResetOutcome {
    let outcome = match run_sequence(&mut client, path) {
        Ok(()) => ResetOutcome::ResetAccepted,
        Err(Step::Refused(e)) => {
            ResetOutcome::ResetRejected(Rejection::new(format!("reset refused locally: {}", e)))
        }
        Err(Step::Server(e)) => ResetOutcome::ResetRejected(rejection(e, timeout)),
    };
    close_h2(&mut client);
    outcome
}

/// Which side stopped the sequence
enum Step {
    /// The client would not send the reset
    Refused(h2::Error),
    /// The server or the network got in the way
    Server(h2::Error),
}

fn run_sequence<S: SessionOps>(client: &mut H2Client<S>, path: &str) -> Result<(), Step> {
    let stream_id = client.send_request_headers("GET", path, true).map_err(Step::Server)?;

    client.send_rst_stream(stream_id, ErrorCode::Cancel).map_err(|e| match e {
        h2::Error::InvalidStreamId(_) | h2::Error::Protocol(_) => Step::Refused(e),
        other => Step::Server(other),
    })?;

    client.ping(PROBE_PING).map_err(Step::Server)
}

/// Describe how the server reacted to the reset
fn rejection(err: h2::Error, timeout: Duration) -> Rejection {
    match err {
        h2::Error::GoAway { code, .. } => {
            let mitigation = ErrorCode::from_u32(code);
            Rejection::goaway(err.to_string(), mitigation)
        }
        h2::Error::ConnectionClosed => Rejection::new("connection closed by server after RST_STREAM"),
        h2::Error::Timeout => Rejection::new(format!(
            "timeout: no PING acknowledgement within {:?} after RST_STREAM",
            timeout
        )),
        h2::Error::Io(e) => match ProbeError::from(e) {
            ProbeError::Timeout(_) => Rejection::new(format!(
                "timeout: no PING acknowledgement within {:?} after RST_STREAM",
                timeout
            )),
            other => Rejection::new(format!("connection reset: {}", other)),
        },
        other => Rejection::new(ProbeError::from(other).to_string()),
    }
}
