//! Protocol Negotiator integration tests
//!
//! Each test points the negotiator at a loopback server speaking one flavour
//! of HTTP and checks the outcome it reports.

mod common;

use common::ResetBehavior;
use rrscan::probe::{negotiate, NegotiationOutcome, ScanTarget};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(2);

fn target(url: &str) -> ScanTarget {
    ScanTarget::parse(url).unwrap()
}

#[test]
fn test_tls_h2_negotiated() {
    let port = common::h2_tls_server(ResetBehavior::Ignore);
    let outcome = negotiate(&target(&format!("https://127.0.0.1:{}/", port)), TIMEOUT);
    assert_eq!(outcome, NegotiationOutcome::NegotiatedH2);
}

#[test]
fn test_tls_http1_downgrade() {
    let port = common::http1_tls_server();
    let outcome = negotiate(&target(&format!("https://127.0.0.1:{}/index.html", port)), TIMEOUT);
    assert_eq!(outcome, NegotiationOutcome::Downgraded("HTTP/1.1".to_string()));
}

#[test]
fn test_h2c_upgrade_negotiated() {
    let port = common::h2c_server(ResetBehavior::Ignore);
    let outcome = negotiate(&target(&format!("http://127.0.0.1:{}/", port)), TIMEOUT);
    assert_eq!(outcome, NegotiationOutcome::NegotiatedH2);
}

#[test]
fn test_cleartext_http10_downgrade() {
    let port = common::http10_server();
    let outcome = negotiate(&target(&format!("http://127.0.0.1:{}/", port)), TIMEOUT);
    assert_eq!(outcome, NegotiationOutcome::Downgraded("HTTP/1.0".to_string()));
}

#[test]
fn test_closed_port() {
    let port = common::closed_port();
    match negotiate(&target(&format!("https://127.0.0.1:{}/", port)), TIMEOUT) {
        NegotiationOutcome::ConnectionError(detail) => {
            assert!(detail.starts_with("connection failure: "), "{}", detail);
        }
        other => panic!("expected a connection error, got {:?}", other),
    }
}

#[test]
fn test_silent_server_times_out() {
    let port = common::silent_server();
    let timeout = Duration::from_millis(300);

    for scheme in ["https", "http"] {
        let started = Instant::now();
        let outcome = negotiate(&target(&format!("{}://127.0.0.1:{}/", scheme, port)), timeout);
        match outcome {
            NegotiationOutcome::ConnectionError(detail) => {
                assert!(detail.starts_with("timeout: "), "{}: {}", scheme, detail);
            }
            other => panic!("{}: expected a timeout, got {:?}", scheme, other),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}

#[test]
fn test_busy_server_cannot_stall_negotiation() {
    let port = common::stalling_h2c_server();
    let timeout = Duration::from_millis(500);
    let target = target(&format!("http://127.0.0.1:{}/", port));

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let started = Instant::now();
        let outcome = negotiate(&target, timeout);
        let _ = tx.send((outcome, started.elapsed()));
    });

    let (outcome, elapsed) = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("negotiation outlived its timeout");
    match outcome {
        NegotiationOutcome::ConnectionError(detail) => {
            assert!(detail.starts_with("timeout: "), "{}", detail);
        }
        other => panic!("expected a timeout, got {:?}", other),
    }
    assert!(elapsed < timeout + Duration::from_millis(500), "took {:?}", elapsed);
}

#[test]
fn test_unresolvable_host() {
    match negotiate(&target("https://rrscan-test.invalid/"), TIMEOUT) {
        NegotiationOutcome::ConnectionError(detail) => {
            assert!(detail.starts_with("connection failure: "), "{}", detail);
        }
        other => panic!("expected a connection error, got {:?}", other),
    }
}
