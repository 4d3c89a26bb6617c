//! Error taxonomy for the submission pipeline

use solana_sdk::{signature::Signature, transaction::TransactionError};
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::wallet::WalletError;

/// Failure classes that drive the orchestrator's decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Anchor expired, not confirmed, send timeout: verify, then maybe retry
    AmbiguousTransient,
    /// Landed with an error; economically final, never retried
    OnChain,
    /// Wallet missing or unable to sign; nothing reached the network
    Precondition,
    /// Refused by the node before landing
    Rejected,
    /// Retry budget consumed without resolution
    Exhausted,
    /// Any other network failure
    Network,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SubmitError {
    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("Wallet does not support signTransaction")]
    SigningUnsupported,

    #[error("Signing failed: {0}")]
    Signing(WalletError),

    #[error("Signed transaction carries no fee payer signature")]
    MissingSignature,

    #[error("Transaction timeout: send of {signature} not acknowledged within {timeout_ms}ms")]
    SendTimeout { signature: Signature, timeout_ms: u64 },

    #[error("Transaction expired: {0}")]
    Expired(LedgerError),

    #[error("Transaction {signature} not confirmed")]
    NotConfirmed { signature: Signature },

    #[error("Transaction confirmed with error: {error}")]
    ConfirmedWithError {
        signature: Signature,
        error: TransactionError,
    },

    #[error("Transaction rejected: {0}")]
    Rejected(TransactionError),

    #[error(transparent)]
    Ledger(LedgerError),

    #[error("Retries exhausted after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<SubmitError> },
}

impl SubmitError {
    pub fn class(&self) -> FailureClass {
        match self {
            Self::WalletNotConnected
            | Self::SigningUnsupported
            | Self::Signing(_)
            | Self::MissingSignature => FailureClass::Precondition,
            Self::SendTimeout { .. } | Self::Expired(_) | Self::NotConfirmed { .. } => {
                FailureClass::AmbiguousTransient
            }
            Self::Ledger(LedgerError::Timeout { .. }) => FailureClass::AmbiguousTransient,
            Self::Ledger(_) => FailureClass::Network,
            Self::ConfirmedWithError { .. } => FailureClass::OnChain,
            Self::Rejected(_) => FailureClass::Rejected,
            Self::Exhausted { .. } => FailureClass::Exhausted,
        }
    }

    /// The transaction may have landed despite this error; check the ledger
    /// before retrying or failing.
    pub fn needs_verification(&self) -> bool {
        self.class() == FailureClass::AmbiguousTransient
    }

    /// Expiry and timeouts may succeed with a freshly anchored attempt.
    /// "Not confirmed" alone is verified but not retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SendTimeout { .. } | Self::Expired(_) | Self::Ledger(LedgerError::Timeout { .. })
        )
    }

    pub fn is_precondition(&self) -> bool {
        self.class() == FailureClass::Precondition
    }

    /// Short label for metrics and logs
    pub fn category(&self) -> &'static str {
        match self.class() {
            FailureClass::AmbiguousTransient => "ambiguous",
            FailureClass::OnChain => "on_chain",
            FailureClass::Precondition => "precondition",
            FailureClass::Rejected => "rejected",
            FailureClass::Exhausted => "exhausted",
            FailureClass::Network => "network",
        }
    }
}

impl From<LedgerError> for SubmitError {
    fn from(err: LedgerError) -> Self {
        match err {
            e if e.is_expiry() => Self::Expired(e),
            LedgerError::NotConfirmed { signature } => Self::NotConfirmed { signature },
            LedgerError::Rejected(tx_err) => Self::Rejected(tx_err),
            other => Self::Ledger(other),
        }
    }
}

impl From<WalletError> for SubmitError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::NotConnected => Self::WalletNotConnected,
            WalletError::SigningUnsupported => Self::SigningUnsupported,
            other => Self::Signing(other),
        }
    }
}
