//! Submission orchestrator
//!
//! Drives one logical transaction from unsigned template to a confirmed
//! ledger entry. Each attempt signs, sends under a timeout and waits for
//! `confirmed` commitment against its freshness anchor. Ambiguous failures
//! are checked with the [`ConfirmationVerifier`] before anything else
//! happens, so a transaction that landed is never re-sent. Retries are
//! re-anchored on a fresh blockhash and re-signed; a signed payload is
//! never mutated.

use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::attempt::{RetryState, TransactionAttempt};
use super::errors::SubmitError;
use super::observer::SubmissionObserver;
use super::verifier::{ConfirmationVerifier, VerificationError, VerificationResult};
use crate::compat;
use crate::config::{SubmissionConfig, VerificationConfig};
use crate::ledger::{FinalizedTransaction, FreshnessAnchor, LedgerClient, SendConfig};
use crate::metrics::{metrics, Timer};
use crate::observability::TraceContext;
use crate::structured_logging::SubmissionLogger;
use crate::wallet::WalletSigner;

/// Per-call options for [`SubmissionOrchestrator::execute`]
#[derive(Debug, Clone, Copy)]
pub struct SubmitOptions {
    /// Anchor the template was built against
    pub anchor: FreshnessAnchor,
    pub skip_preflight: bool,
}

impl SubmitOptions {
    pub fn new(anchor: FreshnessAnchor) -> Self {
        Self {
            anchor,
            skip_preflight: true,
        }
    }

    pub fn with_skip_preflight(mut self, skip_preflight: bool) -> Self {
        self.skip_preflight = skip_preflight;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionResult {
    Success {
        signature: Signature,
        transaction: FinalizedTransaction,
        attempts: u32,
    },
    Failure {
        /// Signature of the last attempt that got as far as signing
        signature: Option<Signature>,
        error: SubmitError,
        attempts: u32,
    },
}

impl SubmissionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn signature(&self) -> Option<&Signature> {
        match self {
            Self::Success { signature, .. } => Some(signature),
            Self::Failure { signature, .. } => signature.as_ref(),
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. } | Self::Failure { attempts, .. } => *attempts,
        }
    }

    pub fn error(&self) -> Option<&SubmitError> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }
}

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Copy of `template` anchored on `anchor`. Re-anchoring invalidates every
/// signature already on the template, so those slots are cleared.
pub(crate) fn anchored_copy(template: &VersionedTransaction, anchor: &FreshnessAnchor) -> VersionedTransaction {
    let mut tx = template.clone();
    if *tx.message.recent_blockhash() != anchor.blockhash {
        tx.message.set_recent_blockhash(anchor.blockhash);
        for slot in tx.signatures.iter_mut() {
            *slot = Signature::default();
        }
    }
    tx
}

#[derive(Debug)]
pub struct SubmissionOrchestrator {
    ledger: Arc<dyn LedgerClient>,
    wallet: Arc<dyn WalletSigner>,
    verifier: ConfirmationVerifier,
    config: SubmissionConfig,
}

impl SubmissionOrchestrator {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        wallet: Arc<dyn WalletSigner>,
        config: SubmissionConfig,
        verification: VerificationConfig,
    ) -> Self {
        let verifier = ConfirmationVerifier::new(ledger.clone(), verification);
        Self {
            ledger,
            wallet,
            verifier,
            config,
        }
    }

    pub fn verifier(&self) -> &ConfirmationVerifier {
        &self.verifier
    }

    pub fn wallet(&self) -> &Arc<dyn WalletSigner> {
        &self.wallet
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.ledger
    }

    /// Wallet must be connected and able to sign before anything is sent
    pub fn check_wallet(&self) -> Result<Pubkey, SubmitError> {
        let pubkey = self.wallet.pubkey().ok_or(SubmitError::WalletNotConnected)?;
        if !self.wallet.supports_signing() {
            return Err(SubmitError::SigningUnsupported);
        }
        Ok(pubkey)
    }

    /// Submit `transaction` until it is confirmed, fails on-chain, or the
    /// retry budget runs out.
    ///
    /// `observer.on_success` fires exactly once on success and never on
    /// failure. The other hooks fire once per attempt.
    ///
    /// A wallet refusal on a retry reports the failure of the attempt before
    /// it, since that attempt was already sent.
    pub async fn execute(
        &self,
        transaction: VersionedTransaction,
        options: SubmitOptions,
        observer: &dyn SubmissionObserver,
    ) -> SubmissionResult {
        let trace = TraceContext::new("execute_transaction");
        let logger = SubmissionLogger::new(trace.correlation_id().clone());
        let timer = Timer::new();
        let started = tokio::time::Instant::now();
        let m = metrics();
        m.submissions_total.inc();
        debug!(
            correlation_id = %logger.correlation_id(),
            trace_id = trace.trace_id(),
            span_id = trace.span_id(),
            operation = %trace.operation,
            "Executing transaction"
        );

        if let Err(error) = self.check_wallet() {
            logger.log_failure(None, 0, error.category(), &error.to_string());
            m.submissions_failed.inc();
            return SubmissionResult::Failure {
                signature: None,
                error,
                attempts: 0,
            };
        }

        let mut state = RetryState::default();
        let mut anchor = options.anchor;

        let outcome = loop {
            state.attempt += 1;
            let mut attempt = TransactionAttempt::new(state.attempt, anchor);
            let result = self
                .run_attempt(
                    &transaction,
                    &mut attempt,
                    state.retries > 0,
                    options.skip_preflight,
                    observer,
                    &logger,
                )
                .await;
            anchor = attempt.anchor;
            if let Some(signature) = attempt.signature {
                state.signatures.push(signature);
            }

            let error = match result {
                Ok(record) => break Ok(record),
                Err(e) => e,
            };
            attempt.mark_failed();
            logger.log_attempt_failed(state.attempt, attempt.signature.as_ref(), &error.to_string());

            // Wallet refused a retry; earlier attempts already reached the network
            if error.is_precondition() {
                if let Some(previous) = state.last_error.take() {
                    warn!(
                        correlation_id = %logger.correlation_id(),
                        attempt = state.attempt,
                        error = %error,
                        "Retry abandoned by wallet"
                    );
                    break Err(previous);
                }
            }

            if error.needs_verification() {
                if let Some(signature) = attempt.signature {
                    let span = trace.child_span("verify_transaction");
                    debug!(
                        correlation_id = %logger.correlation_id(),
                        trace_id = span.trace_id(),
                        span_id = span.span_id(),
                        parent_span_id = ?span.parent_span_id,
                        operation = %span.operation,
                        signature = %signature,
                        "Verifying ambiguous attempt"
                    );
                    match self.verifier.verify(&signature).await {
                        VerificationResult::Success { transaction } => {
                            logger.log_recovered(&signature, "verification");
                            m.recovered_by_verification.inc();
                            break Ok(transaction);
                        }
                        VerificationResult::Failure {
                            error: VerificationError::OnChain(error),
                        } => {
                            break Err(SubmitError::ConfirmedWithError { signature, error });
                        }
                        VerificationResult::Failure { error: verify_err } => {
                            debug!(
                                correlation_id = %logger.correlation_id(),
                                signature = %signature,
                                error = %verify_err,
                                "Verification did not confirm the attempt"
                            );
                        }
                    }
                }
            }

            if !error.is_retryable() {
                break Err(error);
            }
            if state.retries >= self.config.max_retries {
                break Err(SubmitError::Exhausted {
                    attempts: state.attempt,
                    last: Box::new(error),
                });
            }

            state.retries += 1;
            let backoff = self.config.backoff_for(state.retries);
            logger.log_retry(state.retries, millis(backoff));
            m.submission_retries.inc();
            state.last_error = Some(error);
            tokio::time::sleep(backoff).await;
        };

        let result = match outcome {
            Ok(record) => self.succeed(record, state.attempt, started, observer, &logger),
            Err(error) => match self.final_lookup(&state.signatures, &logger).await {
                Some(record) => {
                    logger.log_recovered(&record.signature, "final_lookup");
                    m.recovered_by_final_lookup.inc();
                    self.succeed(record, state.attempt, started, observer, &logger)
                }
                None => {
                    if let Some(previous) = &state.last_error {
                        debug!(
                            correlation_id = %logger.correlation_id(),
                            previous = %previous,
                            "Error before final attempt"
                        );
                    }
                    logger.log_failure(
                        state.signatures.last(),
                        state.attempt,
                        error.category(),
                        &error.to_string(),
                    );
                    m.submissions_failed.inc();
                    SubmissionResult::Failure {
                        signature: state.signatures.last().copied(),
                        error,
                        attempts: state.attempt,
                    }
                }
            },
        };

        timer.observe_duration(&m.submission_latency);
        result
    }

    fn succeed(
        &self,
        record: FinalizedTransaction,
        attempts: u32,
        started: tokio::time::Instant,
        observer: &dyn SubmissionObserver,
        logger: &SubmissionLogger,
    ) -> SubmissionResult {
        let signature = record.signature;
        logger.log_success(&signature, attempts, millis(started.elapsed()));
        metrics().submissions_success.inc();
        observer.on_success(&signature, &record);
        SubmissionResult::Success {
            signature,
            transaction: record,
            attempts,
        }
    }

    async fn run_attempt(
        &self,
        template: &VersionedTransaction,
        attempt: &mut TransactionAttempt,
        refresh_anchor: bool,
        skip_preflight: bool,
        observer: &dyn SubmissionObserver,
        logger: &SubmissionLogger,
    ) -> Result<FinalizedTransaction, SubmitError> {
        if refresh_anchor {
            attempt.anchor = self.ledger.get_latest_blockhash().await?;
        }
        logger.log_attempt(
            attempt.attempt_number,
            &attempt.anchor.blockhash.to_string(),
            refresh_anchor,
        );

        let unsigned = anchored_copy(template, &attempt.anchor);
        observer.on_pending();
        let signed = self.wallet.sign_transaction(unsigned).await?;
        let signature = compat::first_signature(&signed).ok_or(SubmitError::MissingSignature)?;
        attempt.mark_signed(signature);
        logger.log_signed(attempt.attempt_number, &signature);
        observer.on_sending(&signature);

        let m = metrics();
        let send_timer = Timer::new();
        let send_started = tokio::time::Instant::now();
        let timeout = self.config.send_timeout();
        let send = self
            .ledger
            .send_transaction(&signed, SendConfig { skip_preflight });
        match tokio::time::timeout(timeout, send).await {
            Err(_) => {
                m.send_timeouts.inc();
                return Err(SubmitError::SendTimeout {
                    signature,
                    timeout_ms: self.config.send_timeout_ms,
                });
            }
            Ok(Err(e)) => return Err(e.into()),
            Ok(Ok(acknowledged)) => {
                if acknowledged != signature {
                    warn!(
                        correlation_id = %logger.correlation_id(),
                        expected = %signature,
                        acknowledged = %acknowledged,
                        "Node acknowledged a different signature"
                    );
                }
            }
        }
        send_timer.observe_duration(&m.send_latency);
        attempt.mark_sent();
        logger.log_sent(
            attempt.attempt_number,
            &signature,
            millis(send_started.elapsed()),
        );
        observer.on_processed();

        let record = self
            .ledger
            .confirm_transaction(&signature, &attempt.anchor, CommitmentConfig::confirmed())
            .await?;
        if let Some(error) = record.err.clone() {
            return Err(SubmitError::ConfirmedWithError { signature, error });
        }
        attempt.mark_confirmed();
        Ok(record)
    }

    /// Newest-first lookup over every signature this call produced
    async fn final_lookup(
        &self,
        signatures: &[Signature],
        logger: &SubmissionLogger,
    ) -> Option<FinalizedTransaction> {
        if signatures.is_empty() {
            return None;
        }
        metrics().final_lookups.inc();

        for signature in signatures.iter().rev() {
            match self.ledger.get_transaction(signature).await {
                Ok(Some(record)) if record.succeeded() => return Some(record),
                Ok(Some(record)) => {
                    debug!(
                        correlation_id = %logger.correlation_id(),
                        signature = %signature,
                        error = ?record.err,
                        "Attempt landed with error"
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        correlation_id = %logger.correlation_id(),
                        signature = %signature,
                        error = %e,
                        "Error checking final transaction status"
                    );
                }
            }
        }
        None
    }
}
