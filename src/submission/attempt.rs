//! Per-attempt record and the orchestrator's retry accumulator

use solana_sdk::signature::Signature;

use super::errors::SubmitError;
use crate::ledger::FreshnessAnchor;

/// `Pending -> Signed -> Sent -> Confirmed`, or `Failed` from any of them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    Pending,
    Signed,
    Sent,
    Confirmed,
    Failed,
}

/// One send attempt of a logical transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionAttempt {
    /// 1-based
    pub attempt_number: u32,
    pub anchor: FreshnessAnchor,
    /// Assigned only once signing succeeds
    pub signature: Option<Signature>,
    pub phase: AttemptPhase,
}

impl TransactionAttempt {
    pub fn new(attempt_number: u32, anchor: FreshnessAnchor) -> Self {
        Self {
            attempt_number,
            anchor,
            signature: None,
            phase: AttemptPhase::Pending,
        }
    }

    pub fn mark_signed(&mut self, signature: Signature) {
        debug_assert_eq!(self.phase, AttemptPhase::Pending);
        self.signature = Some(signature);
        self.phase = AttemptPhase::Signed;
    }

    pub fn mark_sent(&mut self) {
        debug_assert_eq!(self.phase, AttemptPhase::Signed);
        self.phase = AttemptPhase::Sent;
    }

    pub fn mark_confirmed(&mut self) {
        debug_assert_eq!(self.phase, AttemptPhase::Sent);
        self.phase = AttemptPhase::Confirmed;
    }

    pub fn mark_failed(&mut self) {
        self.phase = AttemptPhase::Failed;
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, AttemptPhase::Confirmed | AttemptPhase::Failed)
    }
}

/// Loop state carried across attempts of one `execute` call
#[derive(Debug, Default)]
pub(crate) struct RetryState {
    pub attempt: u32,
    pub retries: u32,
    pub last_error: Option<SubmitError>,
    /// Every signature produced, oldest first
    pub signatures: Vec<Signature>,
}
