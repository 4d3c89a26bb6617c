//! Ledger module
//!
//! The network RPC capability the submission pipeline consumes: blockhash
//! fetch, send, confirm against a freshness anchor, and signature lookup.
//! The connection behind a [`LedgerClient`] is shared read-only between the
//! orchestrator and the verifier.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    signature::Signature,
    transaction::{TransactionError, VersionedTransaction},
};
use solana_transaction_status::TransactionConfirmationStatus;

pub mod errors;
pub mod rpc_client;

pub use errors::LedgerError;
pub use rpc_client::RpcLedgerClient;

/// Recent blockhash plus the last block height at which it is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessAnchor {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

impl FreshnessAnchor {
    pub fn new(blockhash: Hash, last_valid_block_height: u64) -> Self {
        Self {
            blockhash,
            last_valid_block_height,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendConfig {
    pub skip_preflight: bool,
}

/// Ledger record of a transaction that landed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedTransaction {
    pub signature: Signature,
    pub slot: u64,
    /// On-chain execution error; `None` when the transaction succeeded
    pub err: Option<TransactionError>,
    pub confirmation_status: Option<TransactionConfirmationStatus>,
    pub block_time: Option<i64>,
    pub fee: Option<u64>,
}

impl FinalizedTransaction {
    pub fn succeeded(&self) -> bool {
        self.err.is_none()
    }
}

/// Network RPC capability
#[async_trait]
pub trait LedgerClient: Send + Sync + std::fmt::Debug {
    /// Fresh anchor at `confirmed` commitment
    async fn get_latest_blockhash(&self) -> Result<FreshnessAnchor, LedgerError>;

    /// Submit a signed transaction; returns once the node acknowledges it
    async fn send_transaction(
        &self,
        tx: &VersionedTransaction,
        config: SendConfig,
    ) -> Result<Signature, LedgerError>;

    /// Wait until `signature` reaches `commitment` or the anchor expires.
    ///
    /// A transaction that landed with an on-chain error is returned as
    /// `Ok` with `err` set; expiry is `Err(LedgerError::BlockheightExceeded)`.
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        anchor: &FreshnessAnchor,
        commitment: CommitmentConfig,
    ) -> Result<FinalizedTransaction, LedgerError>;

    /// Direct ledger lookup; `Ok(None)` when the ledger has no record at
    /// `confirmed` commitment or better. Records that landed with an error
    /// are returned at any commitment.
    async fn get_transaction(
        &self,
        signature: &Signature,
    ) -> Result<Option<FinalizedTransaction>, LedgerError>;
}
