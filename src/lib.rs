//! Swap executor library
//!
//! Transaction submission and confirmation for a swap front-end:
//!
//! - [`tracker`]: admission control against duplicate or runaway submissions
//! - [`submission`]: sign, send, confirm and retry one logical transaction,
//!   with ledger verification whenever the outcome is ambiguous
//! - [`swap`]: the session that drives the pipeline and exposes status
//! - [`fees`]: market reference fees and compute unit price patching
//!
//! Network and wallet access go through the [`ledger::LedgerClient`] and
//! [`wallet::WalletSigner`] traits.

pub mod compat;
pub mod config;
pub mod fees;
pub mod ledger;
pub mod metrics;
pub mod observability;
pub mod structured_logging;
pub mod submission;
pub mod swap;
pub mod tracker;
pub mod wallet;

pub mod test_utils;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::VersionedTransaction};
pub use submission::{SubmissionOrchestrator, SubmissionResult, SubmitError, SubmitOptions};
pub use swap::{SwapSession, TxStatus};
pub use tracker::TransactionTracker;
