use solana_sdk::signature::Signature;

use crate::ledger::FinalizedTransaction;

/// Checkpoint notifications from `execute`. All hooks default to no-ops.
pub trait SubmissionObserver: Send + Sync {
    /// About to request a signature from the wallet
    fn on_pending(&self) {}

    /// Signature obtained, network send initiated
    fn on_sending(&self, _signature: &Signature) {}

    /// The node acknowledged the send
    fn on_processed(&self) {}

    /// Ledger-confirmed; called at most once per `execute`
    fn on_success(&self, _signature: &Signature, _transaction: &FinalizedTransaction) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SubmissionObserver for NoopObserver {}
