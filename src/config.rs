//! Configuration module for the swap executor
//!
//! This module handles all configuration loading from TOML files,
//! environment variables, and provides structured configuration types.
//! The loaded [`Config`] is passed explicitly to every component that
//! needs it; there is no process-wide configuration state.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::fees::PriorityLevel;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// RPC endpoint configuration
    pub rpc: RpcConfig,

    /// Wallet configuration
    pub wallet: WalletConfig,

    /// Submission orchestrator configuration
    #[serde(default)]
    pub submission: SubmissionConfig,

    /// Confirmation verifier configuration
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Transaction state tracker configuration
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Priority fee configuration
    #[serde(default)]
    pub fees: FeeConfig,

    /// Monitoring and logging
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// Interval between signature status polls while confirming
    #[serde(default = "default_confirm_poll_interval")]
    pub confirm_poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to keypair file
    pub keypair_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfig {
    /// Retries allowed after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Upper bound on waiting for the network to acknowledge a send
    #[serde(default = "default_send_timeout")]
    pub send_timeout_ms: u64,

    /// Backoff step; retry N waits `N * retry_backoff_ms`
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Skip the node's preflight simulation when sending
    #[serde(default = "default_true")]
    pub skip_preflight: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Number of ledger polls before giving up
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,

    /// Poll N is preceded by a delay of `N * poll_step_ms`
    #[serde(default = "default_poll_step")]
    pub poll_step_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Attempts allowed per logical transaction before a reset is required
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Minimum delay between two attempt starts
    #[serde(default = "default_cooldown")]
    pub cooldown_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Patch the compute unit price from market reference fees
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Reference fee document URL
    #[serde(default = "default_reference_fee_url")]
    pub reference_fee_url: String,

    /// How long a fetched reference fee document stays fresh
    #[serde(default = "default_fee_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Which reference fee tier to pay
    #[serde(default)]
    pub priority_level: PriorityLevel,

    /// Compute unit limit assumed when the transaction does not set one
    #[serde(default = "default_compute_unit_limit")]
    pub default_compute_unit_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub enable_metrics: bool,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub json_logs: bool,
}

// Default value functions
fn default_rpc_timeout() -> u64 { 30 }
fn default_confirm_poll_interval() -> u64 { 500 }
fn default_max_retries() -> u32 { 3 }
fn default_send_timeout() -> u64 { 30_000 }
fn default_retry_backoff() -> u64 { 1_000 }
fn default_max_polls() -> u32 { 5 }
fn default_poll_step() -> u64 { 1_000 }
fn default_max_attempts() -> u32 { 3 }
fn default_cooldown() -> u64 { 5_000 }
fn default_reference_fee_url() -> String { "https://cache.jup.ag/reference-fees".to_string() }
fn default_fee_cache_ttl() -> u64 { 60 }
fn default_compute_unit_limit() -> u32 { 1_400_000 }
fn default_true() -> bool { true }

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            send_timeout_ms: default_send_timeout(),
            retry_backoff_ms: default_retry_backoff(),
            skip_preflight: default_true(),
        }
    }
}

impl SubmissionConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Linear backoff before the given retry (1-based)
    pub fn backoff_for(&self, retry: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(retry as u64))
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            max_polls: default_max_polls(),
            poll_step_ms: default_poll_step(),
        }
    }
}

impl VerificationConfig {
    /// Delay preceding the given poll (1-based)
    pub fn delay_before_poll(&self, poll: u32) -> Duration {
        Duration::from_millis(self.poll_step_ms.saturating_mul(poll as u64))
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            cooldown_ms: default_cooldown(),
        }
    }
}

impl TrackerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            reference_fee_url: default_reference_fee_url(),
            cache_ttl_secs: default_fee_cache_ttl(),
            priority_level: PriorityLevel::default(),
            default_compute_unit_limit: default_compute_unit_limit(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: default_true(),
            json_logs: false,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML document
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    ///
    /// Recognised variables: `SWAP_RPC_URL`, `SWAP_KEYPAIR_PATH`,
    /// `SWAP_SKIP_PREFLIGHT`.
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("SWAP_RPC_URL") {
            self.rpc.url = url;
        }
        if let Ok(path) = std::env::var("SWAP_KEYPAIR_PATH") {
            self.wallet.keypair_path = path;
        }
        if let Ok(flag) = std::env::var("SWAP_SKIP_PREFLIGHT") {
            match flag.parse::<bool>() {
                Ok(v) => self.submission.skip_preflight = v,
                Err(_) => tracing::warn!(value = %flag, "Ignoring invalid SWAP_SKIP_PREFLIGHT"),
            }
        }
    }

    /// Reject values that would make the pipeline hang or never attempt
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc.url.trim().is_empty() {
            anyhow::bail!("rpc.url must not be empty");
        }
        if self.rpc.timeout_secs == 0 {
            anyhow::bail!("rpc.timeout_secs must be greater than zero");
        }
        if self.rpc.confirm_poll_interval_ms == 0 {
            anyhow::bail!("rpc.confirm_poll_interval_ms must be greater than zero");
        }
        if self.submission.send_timeout_ms == 0 {
            anyhow::bail!("submission.send_timeout_ms must be greater than zero");
        }
        if self.verification.max_polls == 0 {
            anyhow::bail!("verification.max_polls must be greater than zero");
        }
        if self.tracker.max_attempts == 0 {
            anyhow::bail!("tracker.max_attempts must be greater than zero");
        }
        if self.fees.default_compute_unit_limit == 0 {
            anyhow::bail!("fees.default_compute_unit_limit must be greater than zero");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: RpcConfig {
                url: "https://api.mainnet-beta.solana.com".to_string(),
                timeout_secs: default_rpc_timeout(),
                confirm_poll_interval_ms: default_confirm_poll_interval(),
            },
            wallet: WalletConfig {
                keypair_path: "~/.config/solana/id.json".to_string(),
            },
            submission: SubmissionConfig::default(),
            verification: VerificationConfig::default(),
            tracker: TrackerConfig::default(),
            fees: FeeConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}
