//! Stream Reset Prober integration tests

mod common;

use common::ResetBehavior;
use rrscan::http::h2::ErrorCode;
use rrscan::probe::{probe_reset, ResetOutcome, ScanTarget};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(2);

fn tls_target(behavior: ResetBehavior) -> ScanTarget {
    let port = common::h2_tls_server(behavior);
    ScanTarget::parse(&format!("https://127.0.0.1:{}/", port)).unwrap()
}

fn rejection(outcome: ResetOutcome) -> rrscan::probe::Rejection {
    match outcome {
        ResetOutcome::ResetRejected(rejection) => rejection,
        other => panic!("expected a rejection, got {:?}", other),
    }
}

#[test]
fn test_reset_accepted_over_tls() {
    let outcome = probe_reset(&tls_target(ResetBehavior::Ignore), TIMEOUT);
    assert_eq!(outcome, ResetOutcome::ResetAccepted);
}

#[test]
fn test_reset_accepted_over_h2c() {
    let port = common::h2c_server(ResetBehavior::Ignore);
    let target = ScanTarget::parse(&format!("http://127.0.0.1:{}/", port)).unwrap();
    assert_eq!(probe_reset(&target, TIMEOUT), ResetOutcome::ResetAccepted);
}

#[test]
fn test_goaway_enhance_your_calm() {
    let outcome = probe_reset(&tls_target(ResetBehavior::GoAway(ErrorCode::EnhanceYourCalm)), TIMEOUT);
    let rejection = rejection(outcome);
    assert_eq!(rejection.mitigation, Some(ErrorCode::EnhanceYourCalm));
    assert!(rejection.detail.contains("ENHANCE_YOUR_CALM"), "{}", rejection.detail);
    assert!(rejection.detail.contains("rapid reset detected"), "{}", rejection.detail);
}

#[test]
fn test_goaway_protocol_error() {
    let outcome = probe_reset(&tls_target(ResetBehavior::GoAway(ErrorCode::ProtocolError)), TIMEOUT);
    let rejection = rejection(outcome);
    assert_eq!(rejection.mitigation, Some(ErrorCode::ProtocolError));
    assert!(!rejection.is_rate_limit());
}

#[test]
fn test_connection_closed_after_reset() {
    let port = common::h2c_server(ResetBehavior::Close);
    let target = ScanTarget::parse(&format!("http://127.0.0.1:{}/", port)).unwrap();

    let rejection = rejection(probe_reset(&target, TIMEOUT));
    assert_eq!(rejection.detail, "connection closed by server after RST_STREAM");
    assert_eq!(rejection.mitigation, None);
}

#[test]
fn test_unanswered_ping_times_out() {
    let outcome = probe_reset(&tls_target(ResetBehavior::Silent), Duration::from_millis(400));
    let rejection = rejection(outcome);
    assert!(rejection.detail.starts_with("timeout: "), "{}", rejection.detail);
}

#[test]
fn test_busy_server_cannot_stall_the_ping() {
    let timeout = Duration::from_millis(600);
    let target = tls_target(ResetBehavior::Chatter);

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let started = Instant::now();
        let outcome = probe_reset(&target, timeout);
        let _ = tx.send((outcome, started.elapsed()));
    });

    let (outcome, elapsed) = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("reset attempt outlived its timeout");
    let rejection = rejection(outcome);
    assert!(rejection.detail.starts_with("timeout: "), "{}", rejection.detail);
    assert_eq!(rejection.mitigation, None);
    assert!(elapsed < timeout + Duration::from_millis(500), "took {:?}", elapsed);
}

#[test]
fn test_unreachable_target_is_rejected() {
    let port = common::closed_port();
    let target = ScanTarget::parse(&format!("https://127.0.0.1:{}/", port)).unwrap();

    let rejection = rejection(probe_reset(&target, TIMEOUT));
    assert!(
        rejection.detail.starts_with("could not open HTTP/2 connection: "),
        "{}",
        rejection.detail
    );
}
