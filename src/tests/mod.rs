//! Crate-internal scenario tests for the submission pipeline.
//!
//! All timing tests run on a paused tokio clock, so sleeps and timeouts
//! resolve instantly while `Instant` still reports the virtual elapsed time.


use std::sync::Arc;

use solana_sdk::hash::Hash;

use crate::config::{SubmissionConfig, VerificationConfig};
use crate::ledger::FreshnessAnchor;
use crate::submission::{SubmissionOrchestrator, SubmitOptions};
use crate::test_utils::{unsigned_swap_transaction, MockLedger, MockWallet};
use solana_sdk::transaction::VersionedTransaction;

pub(crate) struct Harness {
    pub ledger: Arc<MockLedger>,
    pub wallet: Arc<MockWallet>,
    pub orchestrator: SubmissionOrchestrator,
    pub anchor: FreshnessAnchor,
}

impl Harness {
    pub fn new() -> Self {
        let ledger = Arc::new(MockLedger::new());
        let wallet = Arc::new(MockWallet::new());
        let orchestrator = SubmissionOrchestrator::new(
            ledger.clone(),
            wallet.clone(),
            SubmissionConfig::default(),
            VerificationConfig::default(),
        );
        Self {
            ledger,
            wallet,
            orchestrator,
            anchor: FreshnessAnchor::new(Hash::new_unique(), 500),
        }
    }

    pub fn transaction(&self) -> VersionedTransaction {
        unsigned_swap_transaction(&self.wallet.address(), self.anchor.blockhash)
    }

    pub fn options(&self) -> SubmitOptions {
        SubmitOptions::new(self.anchor)
    }
}
