//! Certificate verification: classify how a credential can be checked, call
//! the issuer's endpoint when possible, and otherwise escalate to human
//! review. Every status change goes through the explicit state machine so an
//! illegal transition is an error, not a silent update.

pub mod extractor;
pub mod registry;
pub mod state_machine;
pub mod verifier;

pub use state_machine::VerificationStatus;
