//! Confirmation verifier
//!
//! Re-checks a signature against the ledger when the orchestrator's own
//! wait ended ambiguously. The poll budget is fixed: `max_polls` lookups,
//! poll N preceded by `N * poll_step` (1s, 2s, 3s, 4s, 5s by default).

use solana_sdk::{signature::Signature, transaction::TransactionError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::VerificationConfig;
use crate::ledger::{FinalizedTransaction, LedgerClient};
use crate::metrics::metrics;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum VerificationError {
    #[error("Transaction landed with error: {0}")]
    OnChain(TransactionError),

    #[error("Transaction not found")]
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VerificationResult {
    Success { transaction: FinalizedTransaction },
    Failure { error: VerificationError },
}

impl VerificationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmationVerifier {
    ledger: Arc<dyn LedgerClient>,
    config: VerificationConfig,
}

impl ConfirmationVerifier {
    pub fn new(ledger: Arc<dyn LedgerClient>, config: VerificationConfig) -> Self {
        Self { ledger, config }
    }

    pub async fn verify(&self, signature: &Signature) -> VerificationResult {
        for poll in 1..=self.config.max_polls {
            tokio::time::sleep(self.config.delay_before_poll(poll)).await;
            metrics().verification_polls.inc();

            match self.ledger.get_transaction(signature).await {
                Ok(Some(record)) => {
                    return match record.err.clone() {
                        None => VerificationResult::Success { transaction: record },
                        Some(err) => VerificationResult::Failure {
                            error: VerificationError::OnChain(err),
                        },
                    };
                }
                Ok(None) => {
                    debug!(signature = %signature, poll = poll, "Transaction not on ledger yet");
                }
                // A failed lookup counts as "not found yet"
                Err(e) if e.is_retryable() => {
                    debug!(signature = %signature, poll = poll, error = %e, "Ledger lookup failed");
                }
                Err(e) => {
                    warn!(signature = %signature, poll = poll, error = %e, "Ledger lookup failed");
                }
            }
        }

        VerificationResult::Failure {
            error: VerificationError::NotFound,
        }
    }
}
