//! Swap executor command line front end
//!
//! Submits a prepared, unsigned swap transaction through the submission
//! pipeline, or re-checks a signature against the ledger.

#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use base64::Engine;
use clap::{Parser, Subcommand};
use serde_json::json;
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::VersionedTransaction};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use swap_executor::config::Config;
use swap_executor::fees::{PriorityLevel, ReferenceFeeProvider};
use swap_executor::ledger::{LedgerClient, RpcLedgerClient};
use swap_executor::metrics;
use swap_executor::submission::{ConfirmationVerifier, SubmissionOrchestrator, VerificationResult};
use swap_executor::swap::{PreparedSwap, SwapSession};
use swap_executor::wallet::KeypairWallet;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Print Prometheus metrics after the command finishes
    #[arg(long)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign, send and confirm a prepared swap transaction
    Submit {
        /// Base64 of a bincode-serialized unsigned VersionedTransaction
        #[arg(long)]
        transaction: String,

        /// Reference fee tier; overrides the configured level
        #[arg(long, value_enum)]
        priority: Option<PriorityLevel>,

        /// Run the node's preflight simulation
        #[arg(long)]
        preflight: bool,

        #[arg(long)]
        input_mint: Option<Pubkey>,

        #[arg(long)]
        output_mint: Option<Pubkey>,

        #[arg(long, default_value_t = 0)]
        in_amount: u64,

        #[arg(long, default_value_t = 0)]
        out_amount: u64,
    },

    /// Check whether a signature landed on the ledger
    Verify {
        signature: Signature,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args.config)?;
    init_logging(args.verbose, args.json_logs || config.monitoring.json_logs)?;
    info!(version = env!("CARGO_PKG_VERSION"), rpc = %config.rpc.url, "Starting swap executor");

    let ledger: Arc<dyn LedgerClient> = Arc::new(RpcLedgerClient::new(&config.rpc));

    let output = match args.command {
        Command::Submit {
            transaction,
            priority,
            preflight,
            input_mint,
            output_mint,
            in_amount,
            out_amount,
        } => {
            let swap = PreparedSwapArgs {
                transaction,
                input_mint: input_mint.unwrap_or_default(),
                output_mint: output_mint.unwrap_or_default(),
                in_amount,
                out_amount,
            };
            run_submit(&config, ledger, swap, priority, preflight).await?
        }
        Command::Verify { signature } => run_verify(&config, ledger, &signature).await,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    if args.print_metrics {
        if config.monitoring.enable_metrics {
            print!("{}", metrics::render()?);
        } else {
            warn!("Metrics disabled in configuration");
        }
    }

    Ok(())
}

struct PreparedSwapArgs {
    transaction: String,
    input_mint: Pubkey,
    output_mint: Pubkey,
    in_amount: u64,
    out_amount: u64,
}

fn decode_transaction(encoded: &str) -> Result<VersionedTransaction> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .context("Transaction is not valid base64")?;
    bincode::deserialize(&bytes).context("Transaction is not a bincode VersionedTransaction")
}

async fn run_submit(
    config: &Config,
    ledger: Arc<dyn LedgerClient>,
    args: PreparedSwapArgs,
    priority: Option<PriorityLevel>,
    preflight: bool,
) -> Result<serde_json::Value> {
    let wallet = KeypairWallet::from_file(&config.wallet.keypair_path)
        .with_context(|| format!("Failed to load wallet from {}", config.wallet.keypair_path))?;
    info!(wallet = %wallet.address(), "Wallet loaded");

    let mut transaction = decode_transaction(&args.transaction)?;
    let anchor = ledger
        .get_latest_blockhash()
        .await
        .context("Failed to fetch a fresh blockhash")?;
    transaction.message.set_recent_blockhash(anchor.blockhash);

    let orchestrator = Arc::new(SubmissionOrchestrator::new(
        ledger,
        Arc::new(wallet),
        config.submission.clone(),
        config.verification.clone(),
    ));

    let mut fee_config = config.fees.clone();
    if let Some(level) = priority {
        fee_config.priority_level = level;
    }
    let provider = Arc::new(ReferenceFeeProvider::new(&fee_config)?);
    let skip_preflight = config.submission.skip_preflight && !preflight;
    let session = SwapSession::new(orchestrator, &config.tracker)
        .with_reference_fees(provider, fee_config)
        .with_skip_preflight(skip_preflight);

    let swap = PreparedSwap {
        transaction,
        anchor,
        input_mint: args.input_mint,
        output_mint: args.output_mint,
        in_amount: args.in_amount,
        out_amount: args.out_amount,
        dynamic_slippage_bps: None,
    };

    let output = match session.submit(swap).await {
        Ok(receipt) => json!({
            "status": session.status().map(|s| s.status),
            "receipt": receipt,
        }),
        Err(e) => json!({
            "status": session.status().map(|s| s.status),
            "signature": session.transaction_state().last_signature.map(|s| s.to_string()),
            "error": e.to_string(),
        }),
    };
    Ok(output)
}

async fn run_verify(
    config: &Config,
    ledger: Arc<dyn LedgerClient>,
    signature: &Signature,
) -> serde_json::Value {
    let verifier = ConfirmationVerifier::new(ledger, config.verification.clone());
    match verifier.verify(signature).await {
        VerificationResult::Success { transaction } => json!({
            "success": true,
            "transaction": transaction,
        }),
        VerificationResult::Failure { error } => json!({
            "success": false,
            "error": error.to_string(),
        }),
    }
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "swap_executor=debug,info"
    } else {
        "swap_executor=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file_with_env(path).with_context(|| format!("Failed to load config from {}", path))
    } else {
        let mut config = Config::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}
