//! Test Utilities Module
//!
//! Scripted ledger and wallet doubles for deterministic pipeline tests.
//! Behaviours are queued per operation and consumed in order; once a queue
//! is empty the happy-path default applies.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    compute_budget::ComputeBudgetInstruction,
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::{TransactionError, VersionedTransaction},
};
use solana_transaction_status::TransactionConfirmationStatus;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::time::Instant;

use crate::ledger::{FinalizedTransaction, FreshnessAnchor, LedgerClient, LedgerError, SendConfig};
use crate::submission::SubmissionObserver;
use crate::wallet::{place_signature, WalletError, WalletSigner};

/// Outcome of one `send_transaction` call
#[derive(Debug, Clone)]
pub enum SendBehavior {
    Ack,
    /// Never resolves; only a timeout gets the caller out
    Hang,
    Fail(LedgerError),
}

/// Outcome of one `confirm_transaction` call
#[derive(Debug, Clone)]
pub enum ConfirmBehavior {
    Confirmed,
    LandedWithError(TransactionError),
    Expired,
    NotConfirmed,
    Fail(LedgerError),
}

/// Outcome of one `get_transaction` call
#[derive(Debug, Clone)]
pub enum LookupBehavior {
    NotFound,
    Found,
    FoundWithError(TransactionError),
    Fail(LedgerError),
}

pub fn confirmed_record(signature: Signature, err: Option<TransactionError>) -> FinalizedTransaction {
    FinalizedTransaction {
        signature,
        slot: 42,
        err,
        confirmation_status: Some(TransactionConfirmationStatus::Confirmed),
        block_time: Some(1_700_000_000),
        fee: Some(5_000),
    }
}

#[derive(Debug, Default)]
struct MockLedgerState {
    send: VecDeque<SendBehavior>,
    confirm: VecDeque<ConfirmBehavior>,
    lookup: VecDeque<LookupBehavior>,
    sent: Vec<VersionedTransaction>,
    lookups: Vec<(Signature, Instant)>,
    blockhash_fetches: u32,
}

/// Scripted [`LedgerClient`]
#[derive(Debug, Default)]
pub struct MockLedger {
    state: Mutex<MockLedgerState>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_send(&self, behaviors: impl IntoIterator<Item = SendBehavior>) -> &Self {
        self.state.lock().send.extend(behaviors);
        self
    }

    pub fn queue_confirm(&self, behaviors: impl IntoIterator<Item = ConfirmBehavior>) -> &Self {
        self.state.lock().confirm.extend(behaviors);
        self
    }

    pub fn queue_lookup(&self, behaviors: impl IntoIterator<Item = LookupBehavior>) -> &Self {
        self.state.lock().lookup.extend(behaviors);
        self
    }

    /// Every transaction that reached `send_transaction`, in order
    pub fn sent(&self) -> Vec<VersionedTransaction> {
        self.state.lock().sent.clone()
    }

    pub fn send_count(&self) -> usize {
        self.state.lock().sent.len()
    }

    pub fn lookups(&self) -> Vec<(Signature, Instant)> {
        self.state.lock().lookups.clone()
    }

    pub fn lookup_count(&self) -> usize {
        self.state.lock().lookups.len()
    }

    pub fn blockhash_fetches(&self) -> u32 {
        self.state.lock().blockhash_fetches
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn get_latest_blockhash(&self) -> Result<FreshnessAnchor, LedgerError> {
        let mut state = self.state.lock();
        state.blockhash_fetches += 1;
        Ok(FreshnessAnchor::new(
            Hash::new_unique(),
            1_000 + state.blockhash_fetches as u64 * 150,
        ))
    }

    async fn send_transaction(
        &self,
        tx: &VersionedTransaction,
        _config: SendConfig,
    ) -> Result<Signature, LedgerError> {
        let behavior = {
            let mut state = self.state.lock();
            state.sent.push(tx.clone());
            state.send.pop_front().unwrap_or(SendBehavior::Ack)
        };
        match behavior {
            SendBehavior::Ack => Ok(tx.signatures[0]),
            SendBehavior::Hang => std::future::pending().await,
            SendBehavior::Fail(e) => Err(e),
        }
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        anchor: &FreshnessAnchor,
        _commitment: CommitmentConfig,
    ) -> Result<FinalizedTransaction, LedgerError> {
        let behavior = self
            .state
            .lock()
            .confirm
            .pop_front()
            .unwrap_or(ConfirmBehavior::Confirmed);
        match behavior {
            ConfirmBehavior::Confirmed => Ok(confirmed_record(*signature, None)),
            ConfirmBehavior::LandedWithError(err) => Ok(confirmed_record(*signature, Some(err))),
            ConfirmBehavior::Expired => Err(LedgerError::BlockheightExceeded {
                signature: *signature,
                last_valid_block_height: anchor.last_valid_block_height,
            }),
            ConfirmBehavior::NotConfirmed => Err(LedgerError::NotConfirmed {
                signature: *signature,
            }),
            ConfirmBehavior::Fail(e) => Err(e),
        }
    }

    async fn get_transaction(
        &self,
        signature: &Signature,
    ) -> Result<Option<FinalizedTransaction>, LedgerError> {
        let behavior = {
            let mut state = self.state.lock();
            state.lookups.push((*signature, Instant::now()));
            state.lookup.pop_front().unwrap_or(LookupBehavior::NotFound)
        };
        match behavior {
            LookupBehavior::NotFound => Ok(None),
            LookupBehavior::Found => Ok(Some(confirmed_record(*signature, None))),
            LookupBehavior::FoundWithError(err) => Ok(Some(confirmed_record(*signature, Some(err)))),
            LookupBehavior::Fail(e) => Err(e),
        }
    }
}

/// Keypair wallet with switchable connection, capability and approval
pub struct MockWallet {
    keypair: Keypair,
    connected: AtomicBool,
    signing_supported: AtomicBool,
    reject: AtomicBool,
    approvals_left: AtomicU32,
    sign_count: AtomicU32,
}

impl std::fmt::Debug for MockWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockWallet")
            .field("pubkey", &self.keypair.pubkey())
            .field("connected", &self.connected)
            .finish()
    }
}

impl Default for MockWallet {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWallet {
    pub fn new() -> Self {
        Self {
            keypair: Keypair::new(),
            connected: AtomicBool::new(true),
            signing_supported: AtomicBool::new(true),
            reject: AtomicBool::new(false),
            approvals_left: AtomicU32::new(u32::MAX),
            sign_count: AtomicU32::new(0),
        }
    }

    pub fn address(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn set_signing_supported(&self, supported: bool) {
        self.signing_supported.store(supported, Ordering::SeqCst);
    }

    /// Make the user refuse to approve subsequent signing requests
    pub fn set_reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    /// Approve the next `approvals` signing requests, then reject
    pub fn reject_after(&self, approvals: u32) {
        self.approvals_left.store(approvals, Ordering::SeqCst);
    }

    pub fn sign_count(&self) -> u32 {
        self.sign_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletSigner for MockWallet {
    fn pubkey(&self) -> Option<Pubkey> {
        self.connected
            .load(Ordering::SeqCst)
            .then(|| self.keypair.pubkey())
    }

    fn supports_signing(&self) -> bool {
        self.signing_supported.load(Ordering::SeqCst)
    }

    async fn sign_transaction(
        &self,
        tx: VersionedTransaction,
    ) -> Result<VersionedTransaction, WalletError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(WalletError::NotConnected);
        }
        let approved = self
            .approvals_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if self.reject.load(Ordering::SeqCst) || !approved {
            return Err(WalletError::Rejected("User rejected the request".to_string()));
        }
        self.sign_count.fetch_add(1, Ordering::SeqCst);
        let signature = self.keypair.sign_message(&tx.message.serialize());
        place_signature(tx, &self.keypair.pubkey(), signature)
    }
}

/// Unsigned v0 swap-shaped transaction paid by `payer`, with a compute
/// unit limit so fee patching has something to work with
pub fn unsigned_swap_transaction(payer: &Pubkey, blockhash: Hash) -> VersionedTransaction {
    let swap_ix = Instruction::new_with_bytes(
        Pubkey::new_unique(),
        &[0xe5, 0x17, 0xcb, 0x97],
        vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(Pubkey::new_unique(), false),
        ],
    );
    let instructions = [
        ComputeBudgetInstruction::set_compute_unit_limit(300_000),
        swap_ix,
    ];
    let message = v0::Message::try_compile(payer, &instructions, &[], blockhash)
        .expect("static swap message compiles");
    VersionedTransaction {
        signatures: vec![Signature::default(); 1],
        message: VersionedMessage::V0(message),
    }
}

/// Observer that counts every checkpoint
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub pending: AtomicU32,
    pub sending: AtomicU32,
    pub processed: AtomicU32,
    pub success: AtomicU32,
    signatures: Mutex<Vec<Signature>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::SeqCst)
    }

    /// Signatures reported through `on_sending`
    pub fn sent_signatures(&self) -> Vec<Signature> {
        self.signatures.lock().clone()
    }
}

impl SubmissionObserver for RecordingObserver {
    fn on_pending(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    fn on_sending(&self, signature: &Signature) {
        self.sending.fetch_add(1, Ordering::SeqCst);
        self.signatures.lock().push(*signature);
    }

    fn on_processed(&self) {
        self.processed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_success(&self, _signature: &Signature, _transaction: &FinalizedTransaction) {
        self.success.fetch_add(1, Ordering::SeqCst);
    }
}
