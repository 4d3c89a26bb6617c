//! Swap session
//!
//! The caller side of the submission pipeline: admission through the
//! [`TransactionTracker`], optional priority fee patching, and status
//! updates driven by the orchestrator's checkpoints.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::VersionedTransaction};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::status::{SwapStatus, TxStatus};
use crate::config::{FeeConfig, TrackerConfig};
use crate::fees::{apply_reference_fee, ReferenceFeeProvider};
use crate::ledger::{FinalizedTransaction, FreshnessAnchor};
use crate::metrics::metrics;
use crate::submission::{
    SubmissionObserver, SubmissionOrchestrator, SubmissionResult, SubmitError, SubmitOptions,
};
use crate::tracker::{AttemptBlocked, TransactionState, TransactionTracker};

/// Unsigned swap transaction as produced by the quote service
#[derive(Debug, Clone)]
pub struct PreparedSwap {
    pub transaction: VersionedTransaction,
    pub anchor: FreshnessAnchor,
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub in_amount: u64,
    pub out_amount: u64,
    pub dynamic_slippage_bps: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapReceipt {
    pub signature: Signature,
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub input_amount: u64,
    pub output_amount: u64,
    pub slot: u64,
    pub attempts: u32,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Transaction in progress or too many attempts: {0}")]
    AttemptBlocked(#[from] AttemptBlocked),

    #[error(transparent)]
    Submission(#[from] SubmitError),
}

#[derive(Debug)]
struct SessionState {
    tracker: TransactionTracker,
    status: Option<SwapStatus>,
    last_result: Option<SwapReceipt>,
}

impl SessionState {
    fn set_status(&mut self, status: SwapStatus) {
        debug!(status = ?status.status, txid = ?status.txid, "Swap status");
        self.status = Some(status);
    }
}

/// Maps orchestrator checkpoints onto session status and tracker updates
struct SessionObserver {
    state: Arc<Mutex<SessionState>>,
    slippage_bps: Option<u16>,
}

impl SubmissionObserver for SessionObserver {
    fn on_pending(&self) {
        self.state
            .lock()
            .set_status(SwapStatus::new(TxStatus::PendingApproval).with_slippage(self.slippage_bps));
    }

    fn on_sending(&self, signature: &Signature) {
        let mut state = self.state.lock();
        state.tracker.record_signature(*signature);
        state.set_status(
            SwapStatus::new(TxStatus::Sending)
                .with_txid(*signature)
                .with_slippage(self.slippage_bps),
        );
    }

    fn on_processed(&self) {
        let mut state = self.state.lock();
        let txid = state.tracker.state().last_signature;
        let mut status = SwapStatus::new(TxStatus::Confirming).with_slippage(self.slippage_bps);
        status.txid = txid;
        state.set_status(status);
    }

    fn on_success(&self, _signature: &Signature, _transaction: &FinalizedTransaction) {
        self.state.lock().tracker.record_terminal_outcome(true);
    }
}

pub struct SwapSession {
    orchestrator: Arc<SubmissionOrchestrator>,
    fees: Option<Arc<ReferenceFeeProvider>>,
    fee_config: FeeConfig,
    skip_preflight: bool,
    state: Arc<Mutex<SessionState>>,
}

impl SwapSession {
    pub fn new(orchestrator: Arc<SubmissionOrchestrator>, tracker: &TrackerConfig) -> Self {
        Self {
            orchestrator,
            fees: None,
            fee_config: FeeConfig {
                enabled: false,
                ..FeeConfig::default()
            },
            skip_preflight: true,
            state: Arc::new(Mutex::new(SessionState {
                tracker: TransactionTracker::new(tracker),
                status: None,
                last_result: None,
            })),
        }
    }

    pub fn with_reference_fees(mut self, provider: Arc<ReferenceFeeProvider>, config: FeeConfig) -> Self {
        self.fees = Some(provider);
        self.fee_config = config;
        self
    }

    pub fn with_skip_preflight(mut self, skip_preflight: bool) -> Self {
        self.skip_preflight = skip_preflight;
        self
    }

    pub fn status(&self) -> Option<SwapStatus> {
        self.state.lock().status.clone()
    }

    pub fn last_result(&self) -> Option<SwapReceipt> {
        self.state.lock().last_result.clone()
    }

    pub fn transaction_state(&self) -> TransactionState {
        self.state.lock().tracker.state().clone()
    }

    pub fn can_attempt_new_transaction(&self) -> bool {
        self.state.lock().tracker.can_attempt_new_transaction()
    }

    /// Clear status, last result and tracker. In-flight calls are not
    /// cancelled.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.tracker.reset();
        state.status = None;
        state.last_result = None;
    }

    pub async fn submit(&self, swap: PreparedSwap) -> Result<SwapReceipt, SessionError> {
        self.orchestrator.check_wallet()?;

        {
            let mut state = self.state.lock();
            if let Err(blocked) = state.tracker.check() {
                metrics().attempts_blocked.inc();
                warn!(reason = %blocked, "Swap attempt blocked");
                return Err(blocked.into());
            }
            state.tracker.record_attempt_start();
            state.set_status(SwapStatus::new(TxStatus::Loading));
        }

        info!(
            input_mint = %swap.input_mint,
            output_mint = %swap.output_mint,
            in_amount = swap.in_amount,
            out_amount = swap.out_amount,
            slippage_bps = ?swap.dynamic_slippage_bps,
            "Submitting swap"
        );

        let mut transaction = swap.transaction;
        self.patch_priority_fee(&mut transaction).await;

        let observer = SessionObserver {
            state: self.state.clone(),
            slippage_bps: swap.dynamic_slippage_bps,
        };
        let options = SubmitOptions::new(swap.anchor).with_skip_preflight(self.skip_preflight);
        let result = self.orchestrator.execute(transaction, options, &observer).await;

        let mut state = self.state.lock();
        match result {
            SubmissionResult::Success {
                signature,
                transaction,
                attempts,
            } => {
                let receipt = SwapReceipt {
                    signature,
                    input_mint: swap.input_mint,
                    output_mint: swap.output_mint,
                    input_amount: swap.in_amount,
                    output_amount: swap.out_amount,
                    slot: transaction.slot,
                    attempts,
                };
                state.set_status(
                    SwapStatus::new(TxStatus::Success)
                        .with_txid(signature)
                        .with_slippage(swap.dynamic_slippage_bps),
                );
                state.last_result = Some(receipt.clone());
                Ok(receipt)
            }
            SubmissionResult::Failure {
                error, signature, ..
            } => {
                // Roll back only when nothing was ever signed, so nothing was sent
                if signature.is_none() && error.is_precondition() {
                    state.tracker.record_precondition_failure();
                } else {
                    state.tracker.record_terminal_outcome(false);
                }
                let previous = state.status.as_ref().and_then(|s| s.quoted_dynamic_slippage_bps);
                state.set_status(SwapStatus::new(TxStatus::for_failure(&error)).with_slippage(previous));
                Err(error.into())
            }
        }
    }

    /// Failures here are logged and the swap goes out unpatched
    async fn patch_priority_fee(&self, transaction: &mut VersionedTransaction) {
        let Some(provider) = self.fees.as_ref().filter(|_| self.fee_config.enabled) else {
            return;
        };

        let fee = match provider.fee_for(self.fee_config.priority_level).await {
            Ok(fee) => fee,
            Err(e) => {
                warn!(error = %e, "Reference fees unavailable; sending without fee patch");
                return;
            }
        };

        match apply_reference_fee(transaction, fee, self.fee_config.default_compute_unit_limit) {
            Ok(patch) => debug!(
                fee_lamports = fee,
                cu_limit = patch.compute_unit_limit,
                cu_price = patch.compute_unit_price_micro_lamports,
                inserted = patch.inserted,
                "Applied reference priority fee"
            ),
            Err(e) => warn!(error = %e, "Could not apply reference priority fee"),
        }
    }
}
