//! End-to-end tests of the submission pipeline through the public API

use std::sync::Arc;

use mockito::Matcher;
use serde_json::json;
use solana_sdk::{hash::Hash, signature::Keypair, signature::Signature, signer::Signer};

use swap_executor::config::{Config, RpcConfig};
use swap_executor::ledger::{FreshnessAnchor, LedgerClient, LedgerError, RpcLedgerClient};
use swap_executor::submission::{
    FailureClass, NoopObserver, SubmissionOrchestrator, SubmitError, SubmitOptions,
};
use swap_executor::test_utils::{unsigned_swap_transaction, MockLedger, SendBehavior};
use swap_executor::wallet::KeypairWallet;

#[tokio::test(start_paused = true)]
async fn test_keypair_wallet_end_to_end() {
    let keypair = Keypair::new();
    let payer = keypair.pubkey();
    let ledger = Arc::new(MockLedger::new());
    let config = Config::default();
    let orchestrator = SubmissionOrchestrator::new(
        ledger.clone(),
        Arc::new(KeypairWallet::from_keypair(keypair)),
        config.submission.clone(),
        config.verification.clone(),
    );
    let anchor = FreshnessAnchor::new(Hash::new_unique(), 300);

    let result = orchestrator
        .execute(
            unsigned_swap_transaction(&payer, anchor.blockhash),
            SubmitOptions::new(anchor),
            &NoopObserver,
        )
        .await;

    assert!(result.is_success());
    let sent = ledger.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].verify_with_results().iter().all(|ok| *ok));
    assert_eq!(result.signature(), Some(&sent[0].signatures[0]));
}

#[tokio::test(start_paused = true)]
async fn test_configured_retry_budget_is_respected() {
    let config = Config::from_toml_str(
        r#"
        [rpc]
        url = "http://localhost:8899"

        [wallet]
        keypair_path = "/tmp/id.json"

        [submission]
        max_retries = 1
        send_timeout_ms = 2000

        [verification]
        max_polls = 1
        "#,
    )
    .unwrap();

    let keypair = Keypair::new();
    let payer = keypair.pubkey();
    let ledger = Arc::new(MockLedger::new());
    ledger.queue_send([SendBehavior::Hang, SendBehavior::Hang]);
    let orchestrator = SubmissionOrchestrator::new(
        ledger.clone(),
        Arc::new(KeypairWallet::from_keypair(keypair)),
        config.submission.clone(),
        config.verification.clone(),
    );
    let anchor = FreshnessAnchor::new(Hash::new_unique(), 300);

    let result = orchestrator
        .execute(
            unsigned_swap_transaction(&payer, anchor.blockhash),
            SubmitOptions::new(anchor).with_skip_preflight(false),
            &NoopObserver,
        )
        .await;

    let error = result.error().cloned().unwrap();
    assert_eq!(error.class(), FailureClass::Exhausted);
    assert!(matches!(error, SubmitError::Exhausted { attempts: 2, .. }));
    assert_eq!(ledger.send_count(), 2);
    // One poll per verification plus the final lookup over both signatures
    assert_eq!(ledger.lookup_count(), 4);
}

fn rpc_client(server: &mockito::ServerGuard) -> RpcLedgerClient {
    RpcLedgerClient::new(&RpcConfig {
        url: server.url(),
        timeout_secs: 5,
        confirm_poll_interval_ms: 10,
    })
}

async fn mock_version(server: &mut mockito::ServerGuard) -> mockito::Mock {
    server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({"method": "getVersion"})))
        .with_header("content-type", "application/json")
        .with_body(r#"{"jsonrpc":"2.0","result":{"solana-core":"2.3.0","feature-set":1},"id":1}"#)
        .create_async()
        .await
}

#[tokio::test]
async fn test_rpc_client_latest_blockhash() {
    let mut server = mockito::Server::new_async().await;
    let _version = mock_version(&mut server).await;
    let blockhash = Hash::new_unique();
    let mock = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({"method": "getLatestBlockhash"})))
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "jsonrpc": "2.0",
                "result": {
                    "context": {"slot": 1},
                    "value": {"blockhash": blockhash.to_string(), "lastValidBlockHeight": 3090}
                },
                "id": 1
            })
            .to_string(),
        )
        .create_async()
        .await;

    let anchor = rpc_client(&server).get_latest_blockhash().await.unwrap();

    assert_eq!(anchor, FreshnessAnchor::new(blockhash, 3090));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rpc_client_unknown_signature_is_none() {
    let mut server = mockito::Server::new_async().await;
    let _version = mock_version(&mut server).await;
    let _statuses = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({"method": "getSignatureStatuses"})))
        .with_header("content-type", "application/json")
        .with_body(r#"{"jsonrpc":"2.0","result":{"context":{"slot":5},"value":[null]},"id":1}"#)
        .create_async()
        .await;

    let record = rpc_client(&server)
        .get_transaction(&Signature::new_unique())
        .await
        .unwrap();

    assert!(record.is_none());
}

#[tokio::test]
async fn test_rpc_client_error_response_is_classified() {
    let mut server = mockito::Server::new_async().await;
    let _version = mock_version(&mut server).await;
    let _error = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({"method": "getLatestBlockhash"})))
        .with_header("content-type", "application/json")
        .with_body(r#"{"jsonrpc":"2.0","error":{"code":-32005,"message":"Node is behind"},"id":1}"#)
        .create_async()
        .await;

    let err = rpc_client(&server).get_latest_blockhash().await.unwrap_err();

    match err {
        LedgerError::RpcResponse { code, message } => {
            assert_eq!(code, Some(-32005));
            assert!(message.contains("Node is behind"));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

async fn mock_signature_status(server: &mut mockito::ServerGuard, status: &str) -> mockito::Mock {
    server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({"method": "getSignatureStatuses"})))
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "jsonrpc": "2.0",
                "result": {
                    "context": {"slot": 90},
                    "value": [{
                        "slot": 88,
                        "confirmations": 0,
                        "err": null,
                        "status": {"Ok": null},
                        "confirmationStatus": status
                    }]
                },
                "id": 1
            })
            .to_string(),
        )
        .create_async()
        .await
}

#[tokio::test]
async fn test_rpc_client_processed_status_is_not_landed() {
    let mut server = mockito::Server::new_async().await;
    let _version = mock_version(&mut server).await;
    let _statuses = mock_signature_status(&mut server, "processed").await;

    let record = rpc_client(&server)
        .get_transaction(&Signature::new_unique())
        .await
        .unwrap();

    assert!(record.is_none());
}

#[tokio::test]
async fn test_rpc_client_confirmed_status_is_landed() {
    let mut server = mockito::Server::new_async().await;
    let _version = mock_version(&mut server).await;
    let _statuses = mock_signature_status(&mut server, "confirmed").await;
    let signature = Signature::new_unique();

    // getTransaction is left unmocked; the status alone decides the outcome
    let record = rpc_client(&server)
        .get_transaction(&signature)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(record.signature, signature);
    assert_eq!(record.slot, 88);
    assert!(record.succeeded());
}
