use serde::{Deserialize, Serialize};
use solana_sdk::signature::Signature;

use crate::submission::SubmitError;

/// User-visible progress of the current swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TxStatus {
    Loading,
    PendingApproval,
    Sending,
    Confirming,
    Success,
    Fail,
    Timeout,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Fail | Self::Timeout)
    }

    /// Terminal status for a failed submission. A send that was never
    /// acknowledged reads as a timeout rather than a plain failure.
    pub fn for_failure(error: &SubmitError) -> Self {
        let root = match error {
            SubmitError::Exhausted { last, .. } => last.as_ref(),
            other => other,
        };
        match root {
            SubmitError::SendTimeout { .. } => Self::Timeout,
            _ => Self::Fail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapStatus {
    pub txid: Option<Signature>,
    pub status: TxStatus,
    pub quoted_dynamic_slippage_bps: Option<u16>,
}

impl SwapStatus {
    pub fn new(status: TxStatus) -> Self {
        Self {
            txid: None,
            status,
            quoted_dynamic_slippage_bps: None,
        }
    }

    pub fn with_txid(mut self, txid: Signature) -> Self {
        self.txid = Some(txid);
        self
    }

    pub fn with_slippage(mut self, bps: Option<u16>) -> Self {
        self.quoted_dynamic_slippage_bps = bps;
        self
    }
}
