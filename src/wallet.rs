//! Wallet capability: identity plus transaction signing
//!
//! The orchestrator only ever talks to [`WalletSigner`]. [`KeypairWallet`]
//! is the file-backed implementation used by the CLI.

use anyhow::{Context, Result};
use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use thiserror::Error;

use crate::compat;

/// Wallet-side failures. All of them happen before anything reaches the network.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("Wallet not connected")]
    NotConnected,

    #[error("Wallet does not support signTransaction")]
    SigningUnsupported,

    #[error("Wallet {0} is not a required signer of this transaction")]
    NotASigner(Pubkey),

    #[error("Signing rejected: {0}")]
    Rejected(String),
}

/// External wallet capability
#[async_trait]
pub trait WalletSigner: Send + Sync + std::fmt::Debug {
    /// Public key of the connected account, `None` when disconnected
    fn pubkey(&self) -> Option<Pubkey>;

    /// Whether this wallet can sign transactions at all
    fn supports_signing(&self) -> bool {
        true
    }

    /// Sign `tx` and return it with this wallet's signature slot filled
    async fn sign_transaction(
        &self,
        tx: VersionedTransaction,
    ) -> std::result::Result<VersionedTransaction, WalletError>;
}

/// Keypair-backed wallet
#[derive(Clone)]
pub struct KeypairWallet {
    keypair: Arc<Keypair>,
}

impl std::fmt::Debug for KeypairWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeypairWallet")
            .field("pubkey", &self.keypair.pubkey())
            .finish()
    }
}

impl KeypairWallet {
    /// Create a new wallet from a keypair file (JSON array or raw 64 bytes)
    pub fn from_file(path: &str) -> Result<Self> {
        let keypair_bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read keypair file: {}", path))?;

        let raw = if keypair_bytes.len() == 64 {
            keypair_bytes
        } else {
            let json: Vec<u8> = serde_json::from_slice(&keypair_bytes)
                .context("Failed to parse keypair JSON")?;
            if json.len() != 64 {
                anyhow::bail!("Invalid keypair length: expected 64 bytes, got {}", json.len());
            }
            json
        };

        if raw.iter().all(|&b| b == 0) {
            anyhow::bail!("Invalid keypair: all-zero key rejected");
        }
        let keypair = Keypair::try_from(raw.as_slice()).context("Invalid keypair bytes")?;

        Ok(Self::from_keypair(keypair))
    }

    /// Create a new wallet from a keypair
    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Get the public key
    pub fn address(&self) -> Pubkey {
        self.keypair.pubkey()
    }
}

/// Put `signature` into `signer`'s slot, sizing the signature vector to the
/// header's signer count. Other signers' slots are preserved.
pub(crate) fn place_signature(
    mut tx: VersionedTransaction,
    signer: &Pubkey,
    signature: Signature,
) -> std::result::Result<VersionedTransaction, WalletError> {
    let index = compat::signer_index(&tx.message, signer).ok_or(WalletError::NotASigner(*signer))?;
    let required = compat::get_message_header(&tx.message).num_required_signatures as usize;
    tx.signatures.resize(required, Signature::default());
    tx.signatures[index] = signature;
    Ok(tx)
}

#[async_trait]
impl WalletSigner for KeypairWallet {
    fn pubkey(&self) -> Option<Pubkey> {
        Some(self.keypair.pubkey())
    }

    async fn sign_transaction(
        &self,
        tx: VersionedTransaction,
    ) -> std::result::Result<VersionedTransaction, WalletError> {
        let signature = self.keypair.sign_message(&tx.message.serialize());
        place_signature(tx, &self.keypair.pubkey(), signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{
        hash::Hash,
        instruction::{AccountMeta, Instruction},
        message::{Message, VersionedMessage},
    };
    use std::io::Write;

    fn unsigned_tx(signers: &[Pubkey]) -> VersionedTransaction {
        let accounts = signers.iter().map(|k| AccountMeta::new(*k, true)).collect();
        let ix = Instruction::new_with_bytes(Pubkey::new_unique(), &[7], accounts);
        let mut message = Message::new(&[ix], Some(&signers[0]));
        message.recent_blockhash = Hash::new_unique();
        VersionedTransaction {
            signatures: vec![Signature::default(); signers.len()],
            message: VersionedMessage::Legacy(message),
        }
    }

    #[tokio::test]
    async fn test_sign_fills_own_slot_and_verifies() {
        let wallet = KeypairWallet::from_keypair(Keypair::new());
        let tx = unsigned_tx(&[wallet.address()]);

        let signed = wallet.sign_transaction(tx).await.unwrap();
        assert_ne!(signed.signatures[0], Signature::default());
        assert!(signed.verify_with_results().iter().all(|ok| *ok));
    }

    #[tokio::test]
    async fn test_partial_sign_preserves_other_slots() {
        let payer = Keypair::new();
        let wallet = KeypairWallet::from_keypair(Keypair::new());
        let tx = unsigned_tx(&[payer.pubkey(), wallet.address()]);

        let signed = wallet.sign_transaction(tx).await.unwrap();
        let index = compat::signer_index(&signed.message, &wallet.address()).unwrap();
        assert_ne!(signed.signatures[index], Signature::default());
        assert_eq!(signed.signatures[1 - index], Signature::default());
    }

    #[tokio::test]
    async fn test_non_signer_is_rejected() {
        let wallet = KeypairWallet::from_keypair(Keypair::new());
        let tx = unsigned_tx(&[Pubkey::new_unique()]);

        let err = wallet.sign_transaction(tx).await.unwrap_err();
        assert_eq!(err, WalletError::NotASigner(wallet.address()));
    }

    #[test]
    fn test_from_file_json_and_zero_key() {
        let keypair = Keypair::new();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap()).unwrap();
        let wallet = KeypairWallet::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(wallet.address(), keypair.pubkey());

        let mut zero = tempfile::NamedTempFile::new().unwrap();
        zero.write_all(&[0u8; 64]).unwrap();
        assert!(KeypairWallet::from_file(zero.path().to_str().unwrap()).is_err());
    }
}
