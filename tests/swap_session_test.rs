//! Swap session behaviour: admission, status, tracker bookkeeping and
//! reference fee patching

use std::sync::Arc;
use std::time::Duration;

use solana_sdk::{
    compute_budget::ComputeBudgetInstruction, hash::Hash, instruction::InstructionError,
    pubkey::Pubkey, transaction::TransactionError,
};

use swap_executor::config::{Config, FeeConfig};
use swap_executor::fees::{PriorityLevel, ReferenceFeeProvider};
use swap_executor::ledger::FreshnessAnchor;
use swap_executor::submission::{SubmissionOrchestrator, SubmitError};
use swap_executor::swap::{PreparedSwap, SessionError, SwapSession, TxStatus};
use swap_executor::test_utils::{
    unsigned_swap_transaction, ConfirmBehavior, MockLedger, MockWallet, SendBehavior,
};
use swap_executor::tracker::AttemptBlocked;

struct Fixture {
    ledger: Arc<MockLedger>,
    wallet: Arc<MockWallet>,
    session: Arc<SwapSession>,
}

fn orchestrator(ledger: &Arc<MockLedger>, wallet: &Arc<MockWallet>) -> Arc<SubmissionOrchestrator> {
    let config = Config::default();
    Arc::new(SubmissionOrchestrator::new(
        ledger.clone(),
        wallet.clone(),
        config.submission,
        config.verification,
    ))
}

fn fixture() -> Fixture {
    let ledger = Arc::new(MockLedger::new());
    let wallet = Arc::new(MockWallet::new());
    let session = SwapSession::new(orchestrator(&ledger, &wallet), &Config::default().tracker);
    Fixture {
        ledger,
        wallet,
        session: Arc::new(session),
    }
}

fn prepared(wallet: &MockWallet) -> PreparedSwap {
    let anchor = FreshnessAnchor::new(Hash::new_unique(), 400);
    PreparedSwap {
        transaction: unsigned_swap_transaction(&wallet.address(), anchor.blockhash),
        anchor,
        input_mint: Pubkey::new_unique(),
        output_mint: Pubkey::new_unique(),
        in_amount: 1_000_000,
        out_amount: 42_000,
        dynamic_slippage_bps: Some(50),
    }
}

fn on_chain_error() -> TransactionError {
    TransactionError::InstructionError(3, InstructionError::Custom(6001))
}

#[tokio::test(start_paused = true)]
async fn test_successful_swap_records_receipt_and_resets_tracker() {
    let f = fixture();
    let swap = prepared(&f.wallet);
    let (input_mint, output_mint) = (swap.input_mint, swap.output_mint);

    let receipt = f.session.submit(swap).await.unwrap();

    assert_eq!(receipt.input_mint, input_mint);
    assert_eq!(receipt.output_mint, output_mint);
    assert_eq!(receipt.input_amount, 1_000_000);
    assert_eq!(receipt.output_amount, 42_000);
    assert_eq!(receipt.attempts, 1);

    let status = f.session.status().unwrap();
    assert_eq!(status.status, TxStatus::Success);
    assert_eq!(status.txid, Some(receipt.signature));
    assert_eq!(status.quoted_dynamic_slippage_bps, Some(50));
    assert_eq!(f.session.last_result(), Some(receipt));

    let state = f.session.transaction_state();
    assert_eq!(state.attempt_count, 0);
    assert!(!state.is_processing);
    assert!(state.last_signature.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_on_chain_failure_keeps_attempt_and_enforces_cooldown() {
    let f = fixture();
    f.ledger
        .queue_confirm([ConfirmBehavior::LandedWithError(on_chain_error())]);

    let err = f.session.submit(prepared(&f.wallet)).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Submission(SubmitError::ConfirmedWithError { .. })
    ));

    assert_eq!(f.session.status().unwrap().status, TxStatus::Fail);
    let state = f.session.transaction_state();
    assert_eq!(state.attempt_count, 1);
    assert!(!state.is_processing);
    assert!(state.last_signature.is_some());
    assert!(f.session.last_result().is_none());

    let blocked = f.session.submit(prepared(&f.wallet)).await.unwrap_err();
    assert!(matches!(
        blocked,
        SessionError::AttemptBlocked(AttemptBlocked::CoolingDown { .. })
    ));
    assert_eq!(f.ledger.send_count(), 1);

    tokio::time::advance(Duration::from_secs(5)).await;
    assert!(f.session.can_attempt_new_transaction());
    f.session.submit(prepared(&f.wallet)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_attempt_budget_requires_reset() {
    let f = fixture();
    for _ in 0..3 {
        f.ledger
            .queue_confirm([ConfirmBehavior::LandedWithError(on_chain_error())]);
        assert!(f.session.submit(prepared(&f.wallet)).await.is_err());
        tokio::time::advance(Duration::from_secs(5)).await;
    }

    let blocked = f.session.submit(prepared(&f.wallet)).await.unwrap_err();
    assert!(matches!(
        blocked,
        SessionError::AttemptBlocked(AttemptBlocked::AttemptsExhausted {
            attempts: 3,
            max_attempts: 3
        })
    ));

    f.session.reset();
    assert!(f.session.status().is_none());
    assert_eq!(f.session.transaction_state().attempt_count, 0);
    f.session.submit(prepared(&f.wallet)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_signing_rejection_does_not_consume_budget() {
    let f = fixture();
    f.wallet.set_reject(true);

    let err = f.session.submit(prepared(&f.wallet)).await.unwrap_err();
    assert!(matches!(err, SessionError::Submission(ref e) if e.is_precondition()));

    let state = f.session.transaction_state();
    assert_eq!(state.attempt_count, 0);
    assert!(!state.is_processing);
    assert_eq!(f.ledger.send_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_retry_still_consumes_budget() {
    let f = fixture();
    f.ledger.queue_send([SendBehavior::Hang]);
    f.wallet.reject_after(1);

    let err = f.session.submit(prepared(&f.wallet)).await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Submission(SubmitError::SendTimeout { .. })
    ));
    assert_eq!(f.ledger.send_count(), 1);
    assert_eq!(f.session.status().unwrap().status, TxStatus::Timeout);

    let state = f.session.transaction_state();
    assert_eq!(state.attempt_count, 1);
    assert!(!state.is_processing);
    assert!(state.last_signature.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_disconnected_wallet_leaves_tracker_untouched() {
    let f = fixture();
    f.wallet.set_connected(false);

    let err = f.session.submit(prepared(&f.wallet)).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Submission(SubmitError::WalletNotConnected)
    ));
    assert!(f.session.status().is_none());
    assert!(f.session.transaction_state().last_attempt_time.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_unacknowledged_sends_end_in_timeout_status() {
    let f = fixture();
    f.ledger.queue_send([
        SendBehavior::Hang,
        SendBehavior::Hang,
        SendBehavior::Hang,
        SendBehavior::Hang,
    ]);

    let err = f.session.submit(prepared(&f.wallet)).await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Submission(SubmitError::Exhausted { attempts: 4, .. })
    ));
    let status = f.session.status().unwrap();
    assert_eq!(status.status, TxStatus::Timeout);
    assert_eq!(status.quoted_dynamic_slippage_bps, Some(50));
    assert_eq!(f.session.transaction_state().attempt_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_submit_is_blocked_while_processing() {
    let f = fixture();
    f.ledger.queue_send([SendBehavior::Hang]);

    let first = {
        let session = f.session.clone();
        let swap = prepared(&f.wallet);
        tokio::spawn(async move { session.submit(swap).await })
    };

    while f.session.status().map(|s| s.status) != Some(TxStatus::Sending) {
        tokio::task::yield_now().await;
    }
    let state = f.session.transaction_state();
    assert!(state.is_processing);
    assert!(state.last_signature.is_some());

    let blocked = f.session.submit(prepared(&f.wallet)).await.unwrap_err();
    assert!(matches!(
        blocked,
        SessionError::AttemptBlocked(AttemptBlocked::Processing)
    ));

    // The hung send times out, the retry confirms
    let receipt = first.await.unwrap().unwrap();
    assert_eq!(receipt.attempts, 2);
}

fn fee_session(f: &Fixture, server_url: String) -> SwapSession {
    let fee_config = FeeConfig {
        enabled: true,
        reference_fee_url: format!("{}/reference-fees", server_url),
        priority_level: PriorityLevel::High,
        ..FeeConfig::default()
    };
    let provider = Arc::new(ReferenceFeeProvider::new(&fee_config).unwrap());
    SwapSession::new(orchestrator(&f.ledger, &f.wallet), &Config::default().tracker)
        .with_reference_fees(provider, fee_config)
}

#[tokio::test]
async fn test_reference_fee_is_patched_before_signing() {
    let mut server = mockito::Server::new_async().await;
    let _fees = server
        .mock("GET", "/reference-fees")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"claim":1,"jup":{"m":10000,"h":30000,"vh":90000},"jup2":{"m":1,"h":1,"vh":1},
               "loAndDCA":1,"referral":1,"perps":{"m":1,"h":1,"vh":1},"swapFee":5000,
               "lastUpdatedAt":1718000000000}"#,
        )
        .create_async()
        .await;
    let f = fixture();
    let session = fee_session(&f, server.url());

    session.submit(prepared(&f.wallet)).await.unwrap();

    // 30_000 lamports over the transaction's 300_000 unit limit
    let expected = ComputeBudgetInstruction::set_compute_unit_price(100_000).data;
    let sent = f.ledger.sent();
    assert!(sent[0]
        .message
        .instructions()
        .iter()
        .any(|ix| ix.data == expected));
    assert!(sent[0].verify_with_results().iter().all(|ok| *ok));
}

#[tokio::test]
async fn test_fee_outage_sends_unpatched() {
    let mut server = mockito::Server::new_async().await;
    let _fees = server
        .mock("GET", "/reference-fees")
        .with_status(503)
        .create_async()
        .await;
    let f = fixture();
    let session = fee_session(&f, server.url());
    let swap = prepared(&f.wallet);
    let original = swap.transaction.message.instructions().to_vec();

    session.submit(swap).await.unwrap();

    assert_eq!(f.ledger.sent()[0].message.instructions(), original.as_slice());
}
