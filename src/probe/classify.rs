//! Classifier

use super::{NegotiationOutcome, ResetOutcome, VulnerabilityStatus};

/// Map the two probe outcomes to a status and its detail
///
/// | negotiation         | reset                          | status     |
/// |---------------------|--------------------------------|------------|
/// | `NegotiatedH2`      | `ResetAccepted`                | VULNERABLE |
/// | `NegotiatedH2`      | rejected with ENHANCE_YOUR_CALM | SAFE      |
/// | `NegotiatedH2`      | rejected otherwise             | LIKELY     |
/// | `Downgraded(v)`     | `NotAttempted`                 | POSSIBLE   |
/// | `ConnectionError(e)`| `NotAttempted`                 | ERROR      |
///
/// Any other pairing cannot come out of a scan and is reported as ERROR.
pub fn classify(negotiation: &NegotiationOutcome, reset: &ResetOutcome) -> (VulnerabilityStatus, String) {
    match (negotiation, reset) {
        (NegotiationOutcome::NegotiatedH2, ResetOutcome::ResetAccepted) => {
            (VulnerabilityStatus::Vulnerable, String::new())
        }
        (NegotiationOutcome::NegotiatedH2, ResetOutcome::ResetRejected(rejection)) => {
            let status = if rejection.is_rate_limit() {
                VulnerabilityStatus::Safe
            } else {
                VulnerabilityStatus::Likely
            };
            (status, rejection.detail.clone())
        }
        (NegotiationOutcome::Downgraded(version), ResetOutcome::NotAttempted) => {
            (VulnerabilityStatus::Possible, version.clone())
        }
        (NegotiationOutcome::ConnectionError(detail), ResetOutcome::NotAttempted) => {
            (VulnerabilityStatus::Error, detail.clone())
        }
        (negotiation, reset) => (
            VulnerabilityStatus::Error,
            format!("unexpected state: {}, {}", negotiation, reset),
        ),
    }
}
