//! `LedgerClient` backed by the Solana nonblocking RPC client

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::config::{RpcSendTransactionConfig, RpcTransactionConfig};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    signature::Signature,
    transaction::VersionedTransaction,
};
use solana_transaction_status::{TransactionStatus, UiTransactionEncoding};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{FinalizedTransaction, FreshnessAnchor, LedgerClient, LedgerError, SendConfig};
use crate::config::RpcConfig;

pub struct RpcLedgerClient {
    rpc: Arc<RpcClient>,
    confirm_poll_interval: Duration,
}

impl std::fmt::Debug for RpcLedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcLedgerClient")
            .field("url", &self.rpc.url())
            .field("confirm_poll_interval", &self.confirm_poll_interval)
            .finish()
    }
}

fn record_from_status(signature: &Signature, status: TransactionStatus) -> FinalizedTransaction {
    FinalizedTransaction {
        signature: *signature,
        slot: status.slot,
        err: status.err,
        confirmation_status: status.confirmation_status,
        block_time: None,
        fee: None,
    }
}

impl RpcLedgerClient {
    pub fn new(config: &RpcConfig) -> Self {
        let rpc = RpcClient::new_with_timeout_and_commitment(
            config.url.clone(),
            Duration::from_secs(config.timeout_secs),
            CommitmentConfig::confirmed(),
        );
        Self {
            rpc: Arc::new(rpc),
            confirm_poll_interval: Duration::from_millis(config.confirm_poll_interval_ms),
        }
    }

    async fn signature_status(
        &self,
        signature: &Signature,
        search_history: bool,
    ) -> Result<Option<TransactionStatus>, LedgerError> {
        let response = if search_history {
            self.rpc
                .get_signature_statuses_with_history(std::slice::from_ref(signature))
                .await?
        } else {
            self.rpc
                .get_signature_statuses(std::slice::from_ref(signature))
                .await?
        };
        Ok(response.value.into_iter().next().flatten())
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn get_latest_blockhash(&self) -> Result<FreshnessAnchor, LedgerError> {
        let (blockhash, last_valid_block_height) = self
            .rpc
            .get_latest_blockhash_with_commitment(CommitmentConfig::confirmed())
            .await?;
        Ok(FreshnessAnchor::new(blockhash, last_valid_block_height))
    }

    async fn send_transaction(
        &self,
        tx: &VersionedTransaction,
        config: SendConfig,
    ) -> Result<Signature, LedgerError> {
        let send_config = RpcSendTransactionConfig {
            skip_preflight: config.skip_preflight,
            preflight_commitment: Some(CommitmentConfig::confirmed().commitment),
            encoding: Some(UiTransactionEncoding::Base64),
            ..RpcSendTransactionConfig::default()
        };
        Ok(self.rpc.send_transaction_with_config(tx, send_config).await?)
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        anchor: &FreshnessAnchor,
        commitment: CommitmentConfig,
    ) -> Result<FinalizedTransaction, LedgerError> {
        loop {
            if let Some(status) = self.signature_status(signature, false).await? {
                if status.err.is_some() || status.satisfies_commitment(commitment) {
                    return Ok(record_from_status(signature, status));
                }
            }

            let block_height = self.rpc.get_block_height_with_commitment(commitment).await?;
            if block_height > anchor.last_valid_block_height {
                return Err(LedgerError::BlockheightExceeded {
                    signature: *signature,
                    last_valid_block_height: anchor.last_valid_block_height,
                });
            }

            debug!(
                signature = %signature,
                block_height = block_height,
                last_valid_block_height = anchor.last_valid_block_height,
                "Awaiting confirmation"
            );
            tokio::time::sleep(self.confirm_poll_interval).await;
        }
    }

    async fn get_transaction(
        &self,
        signature: &Signature,
    ) -> Result<Option<FinalizedTransaction>, LedgerError> {
        let Some(status) = self.signature_status(signature, true).await? else {
            return Ok(None);
        };
        // A processed-only status can still be dropped on a fork
        if status.err.is_none() && !status.satisfies_commitment(CommitmentConfig::confirmed()) {
            debug!(
                signature = %signature,
                slot = status.slot,
                status = ?status.confirmation_status,
                "Transaction seen below confirmed commitment"
            );
            return Ok(None);
        }
        let mut record = record_from_status(signature, status);

        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };
        match self.rpc.get_transaction_with_config(signature, config).await {
            Ok(confirmed) => {
                record.block_time = confirmed.block_time;
                record.fee = confirmed.transaction.meta.as_ref().map(|meta| meta.fee);
            }
            Err(e) => {
                // Status is authoritative for the outcome; the full record may lag
                debug!(signature = %signature, error = %e, "Full transaction record unavailable");
            }
        }

        Ok(Some(record))
    }
}
