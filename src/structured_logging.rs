//! Structured logging for submission pipeline events
//!
//! Every attempt and its resolution is logged with the correlation id,
//! attempt number, signature and error message so a failed swap can be
//! reconstructed from logs alone.

use solana_sdk::signature::Signature;

use crate::observability::CorrelationId;

/// Structured logger bound to one logical submission
#[derive(Debug, Clone)]
pub struct SubmissionLogger {
    correlation_id: CorrelationId,
}

fn sig_field(signature: Option<&Signature>) -> String {
    signature.map(|s| s.to_string()).unwrap_or_default()
}

impl SubmissionLogger {
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self { correlation_id }
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn log_attempt(&self, attempt: u32, blockhash: &str, refreshed: bool) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            attempt = attempt,
            blockhash = %blockhash,
            refreshed_anchor = refreshed,
            "Attempting transaction"
        );
    }

    pub fn log_signed(&self, attempt: u32, signature: &Signature) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            attempt = attempt,
            signature = %signature,
            "Transaction signed, sending"
        );
    }

    pub fn log_sent(&self, attempt: u32, signature: &Signature, latency_ms: u64) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            attempt = attempt,
            signature = %signature,
            latency_ms = latency_ms,
            "Transaction sent, awaiting confirmation"
        );
    }

    pub fn log_attempt_failed(&self, attempt: u32, signature: Option<&Signature>, error: &str) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            attempt = attempt,
            signature = %sig_field(signature),
            error = %error,
            "Transaction attempt failed"
        );
    }

    pub fn log_retry(&self, retry: u32, backoff_ms: u64) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            retry = retry,
            backoff_ms = backoff_ms,
            "Retrying with a fresh blockhash"
        );
    }

    pub fn log_recovered(&self, signature: &Signature, via: &str) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            signature = %signature,
            via = %via,
            "Transaction actually succeeded"
        );
    }

    pub fn log_success(&self, signature: &Signature, attempts: u32, latency_ms: u64) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            signature = %signature,
            attempts = attempts,
            latency_ms = latency_ms,
            "Transaction confirmed"
        );
    }

    pub fn log_failure(
        &self,
        signature: Option<&Signature>,
        attempts: u32,
        category: &str,
        error: &str,
    ) {
        tracing::error!(
            correlation_id = %self.correlation_id,
            signature = %sig_field(signature),
            attempts = attempts,
            category = category,
            error = %error,
            "All transaction attempts failed"
        );
    }
}
