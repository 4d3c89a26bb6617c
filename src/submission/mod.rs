//! Submission module
//!
//! Orchestrates signing, sending, confirming and retrying one logical
//! transaction, with ledger verification on ambiguous outcomes.

pub mod attempt;
pub mod errors;
pub mod observer;
pub mod orchestrator;
pub mod verifier;

pub use attempt::{AttemptPhase, TransactionAttempt};
pub use errors::{FailureClass, SubmitError};
pub use observer::{NoopObserver, SubmissionObserver};
pub use orchestrator::{SubmissionOrchestrator, SubmissionResult, SubmitOptions};
pub use verifier::{ConfirmationVerifier, VerificationError, VerificationResult};
