//! Priority fees
//!
//! Market reference fees fetched from a public document, and the
//! compute-budget patch that turns a chosen tier into a compute unit price
//! on an unsigned transaction.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod compute_budget;
pub mod reference;

pub use compute_budget::{apply_reference_fee, ComputeBudgetPatch};
pub use reference::{Fee, MarketReferenceFee, ReferenceFeeProvider};

/// Reference fee tier the user pays for
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityLevel {
    #[default]
    Medium,
    High,
    VeryHigh,
}

impl std::fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::VeryHigh => "VERY_HIGH",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum FeeError {
    #[error("Reference fee request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Reference fee document has no usable fee for {0}")]
    NoFee(PriorityLevel),

    #[error("Cannot patch fees on a signed transaction")]
    AlreadySigned,

    #[error("Transaction does not reference the compute budget program")]
    ComputeBudgetProgramMissing,

    #[error("Compute unit limit must be greater than zero")]
    ZeroComputeUnitLimit,
}
