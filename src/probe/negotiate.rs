//! Protocol Negotiator
//!
//! Answers one question: does the target carry a response over HTTP/2?
//! One attempt, no retries, finished within `timeout` overall. Any failure
//! along the way becomes `ConnectionError` with the categorized reason as
//! detail.

use super::connect::{self, close_h2, H2Connection, Opened};
use super::{NegotiationOutcome, ProbeError, ScanTarget};
use crate::http::h2::{H2Client, StreamId};
use crate::http::SessionOps;
use std::time::{Duration, Instant};

/// Probe `target` for HTTP/2 support
pub fn negotiate(target: &ScanTarget, timeout: Duration) -> NegotiationOutcome {
    match try_negotiate(target, timeout) {
        Ok(outcome) => {
            log::debug!("{}: {}", target, outcome);
            outcome
        }
        Err(e) => {
            log::debug!("{}: negotiation failed: {}", target, e);
            NegotiationOutcome::ConnectionError(e.to_string())
        }
    }
}

fn try_negotiate(target: &ScanTarget, timeout: Duration) -> Result<NegotiationOutcome, ProbeError> {
    let deadline = Instant::now() + timeout;
    match connect::open(target, timeout, deadline)? {
        Opened::H2(H2Connection::Tls(client)) => await_response(client, None, target.path()),
        Opened::H2(H2Connection::Upgraded(client)) => await_response(client, Some(1), target.path()),
        Opened::Http1(version) => Ok(NegotiationOutcome::Downgraded(version.as_str().to_string())),
    }
}

/// Wait for the final response HEADERS on `stream`, opening a `GET` stream
/// first when none is outstanding
fn await_response<S: SessionOps>(
    mut client: H2Client<S>,
    stream: Option<StreamId>,
    path: &str,
) -> Result<NegotiationOutcome, ProbeError> {
    let result = match stream {
        Some(id) => client.recv_response_headers(id),
        None => client
            .send_request_headers("GET", path, true)
            .and_then(|id| client.recv_response_headers(id)),
    };
    close_h2(&mut client);

    let response = result?;
    log::debug!("HTTP/2 response {} on stream {}", response.status(), response.stream_id);
    Ok(NegotiationOutcome::NegotiatedH2)
}
