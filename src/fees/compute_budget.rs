//! Compute unit price patching for unsigned transactions

use solana_sdk::{
    compute_budget::{self, ComputeBudgetInstruction},
    instruction::CompiledInstruction,
    transaction::VersionedTransaction,
};

use super::FeeError;
use crate::compat;

const SET_COMPUTE_UNIT_LIMIT_TAG: u8 = 2;
const SET_COMPUTE_UNIT_PRICE_TAG: u8 = 3;

/// What [`apply_reference_fee`] wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeBudgetPatch {
    pub compute_unit_limit: u32,
    pub compute_unit_price_micro_lamports: u64,
    /// A new instruction was added rather than an existing one rewritten
    pub inserted: bool,
}

/// `fee_lamports` spread over `cu_limit` units, in micro-lamports per unit
pub fn compute_unit_price(fee_lamports: u64, cu_limit: u32) -> Result<u64, FeeError> {
    if cu_limit == 0 {
        return Err(FeeError::ZeroComputeUnitLimit);
    }
    let price = fee_lamports as u128 * 1_000_000 / cu_limit as u128;
    Ok(u64::try_from(price).unwrap_or(u64::MAX))
}

fn compute_unit_limit_of(ix: &CompiledInstruction) -> Option<u32> {
    match ix.data.as_slice() {
        [SET_COMPUTE_UNIT_LIMIT_TAG, b0, b1, b2, b3, ..] => {
            Some(u32::from_le_bytes([*b0, *b1, *b2, *b3]))
        }
        _ => None,
    }
}

/// Set the compute unit price so the whole compute budget costs roughly
/// `fee_lamports` in priority fees.
///
/// The limit comes from the transaction's own `SetComputeUnitLimit` when
/// present, otherwise `default_cu_limit`. An existing `SetComputeUnitPrice`
/// is rewritten in place; otherwise one is inserted after the last
/// compute-budget instruction, which requires the program to already be
/// among the static account keys.
pub fn apply_reference_fee(
    tx: &mut VersionedTransaction,
    fee_lamports: u64,
    default_cu_limit: u32,
) -> Result<ComputeBudgetPatch, FeeError> {
    if compat::has_any_signature(tx) {
        return Err(FeeError::AlreadySigned);
    }

    let program_index = compat::get_static_account_keys(&tx.message)
        .iter()
        .position(|key| *key == compute_budget::id())
        .ok_or(FeeError::ComputeBudgetProgramMissing)?;
    let program_index =
        u8::try_from(program_index).map_err(|_| FeeError::ComputeBudgetProgramMissing)?;

    let instructions = compat::get_instructions_mut(&mut tx.message);
    let budget_positions: Vec<usize> = instructions
        .iter()
        .enumerate()
        .filter(|(_, ix)| ix.program_id_index == program_index)
        .map(|(i, _)| i)
        .collect();

    let cu_limit = budget_positions
        .iter()
        .find_map(|&i| compute_unit_limit_of(&instructions[i]))
        .unwrap_or(default_cu_limit);
    let price = compute_unit_price(fee_lamports, cu_limit)?;
    let data = ComputeBudgetInstruction::set_compute_unit_price(price).data;

    let existing = budget_positions
        .iter()
        .copied()
        .find(|&i| instructions[i].data.first() == Some(&SET_COMPUTE_UNIT_PRICE_TAG));
    let inserted = match existing {
        Some(i) => {
            instructions[i].data = data;
            false
        }
        None => {
            let at = budget_positions.last().map(|i| i + 1).unwrap_or(0);
            instructions.insert(
                at,
                CompiledInstruction {
                    program_id_index: program_index,
                    accounts: vec![],
                    data,
                },
            );
            true
        }
    };

    Ok(ComputeBudgetPatch {
        compute_unit_limit: cu_limit,
        compute_unit_price_micro_lamports: price,
        inserted,
    })
}
