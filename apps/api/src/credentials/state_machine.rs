use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Credential lifecycle states. `Unverifiable` is terminal; the only exits
/// from `HumanReview` are the reviewer's accept/reject operations; escalation
/// (`AutoVerifyPending → HumanReview`) is a legal edge because automatic
/// verification failures are never terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationStatus {
    Pending,
    AutoVerifyPending,
    HumanReview,
    Verified,
    Rejected,
    Unverifiable,
}

#[derive(Debug, Error, PartialEq)]
#[error("illegal credential transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: VerificationStatus,
    pub to: VerificationStatus,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::AutoVerifyPending => "auto-verify-pending",
            VerificationStatus::HumanReview => "human-review",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Rejected => "rejected",
            VerificationStatus::Unverifiable => "unverifiable",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(VerificationStatus::Pending),
            "auto-verify-pending" => Some(VerificationStatus::AutoVerifyPending),
            "human-review" => Some(VerificationStatus::HumanReview),
            "verified" => Some(VerificationStatus::Verified),
            "rejected" => Some(VerificationStatus::Rejected),
            "unverifiable" => Some(VerificationStatus::Unverifiable),
            _ => None,
        }
    }

    /// The transition table. Everything not listed is illegal.
    pub fn can_transition_to(&self, to: VerificationStatus) -> bool {
        use VerificationStatus::*;
        matches!(
            (self, to),
            (Pending, AutoVerifyPending)
                | (Pending, HumanReview)
                | (Pending, Unverifiable)
                | (AutoVerifyPending, Verified)
                | (AutoVerifyPending, HumanReview)
                | (HumanReview, Verified)
                | (HumanReview, Rejected)
        )
    }

    pub fn transition_to(&self, to: VerificationStatus) -> Result<VerificationStatus, TransitionError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(TransitionError { from: *self, to })
        }
    }

    pub fn is_terminal(&self) -> bool {
        use VerificationStatus::*;
        matches!(self, Verified | Rejected | Unverifiable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use VerificationStatus::*;

    const ALL: [VerificationStatus; 6] = [
        Pending,
        AutoVerifyPending,
        HumanReview,
        Verified,
        Rejected,
        Unverifiable,
    ];

    #[test]
    fn test_pending_fans_out_to_exactly_three_states() {
        let targets: Vec<_> = ALL
            .iter()
            .filter(|to| Pending.can_transition_to(**to))
            .collect();
        assert_eq!(targets, vec![&AutoVerifyPending, &HumanReview, &Unverifiable]);
    }

    #[test]
    fn test_unverifiable_has_no_outgoing_transitions() {
        for to in ALL {
            assert!(!Unverifiable.can_transition_to(to));
        }
        assert!(Unverifiable.is_terminal());
    }

    #[test]
    fn test_escalation_edge_is_legal() {
        assert!(AutoVerifyPending.can_transition_to(HumanReview));
    }

    #[test]
    fn test_auto_verify_cannot_reject() {
        // Rejection is reserved for human reviewers.
        assert!(!AutoVerifyPending.can_transition_to(Rejected));
    }

    #[test]
    fn test_human_review_exits_only_via_decision() {
        let targets: Vec<_> = ALL
            .iter()
            .filter(|to| HumanReview.can_transition_to(**to))
            .collect();
        assert_eq!(targets, vec![&Verified, &Rejected]);
    }

    #[test]
    fn test_illegal_transition_is_an_error() {
        let err = Unverifiable.transition_to(Verified).unwrap_err();
        assert_eq!(err.from, Unverifiable);
        assert_eq!(err.to, Verified);
    }

    #[test]
    fn test_round_trip_string_encoding() {
        for status in ALL {
            assert_eq!(VerificationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(VerificationStatus::parse("bogus"), None);
    }
}
