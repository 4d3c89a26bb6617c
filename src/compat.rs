//! Compatibility layer for Solana SDK message types
//!
//! Swap transactions arrive either as Legacy or V0 messages. Both formats
//! expose the same information through different structs; this module gives
//! the rest of the crate a single API for headers, account keys, compiled
//! instructions and signature slots regardless of version.

use solana_sdk::{
    instruction::CompiledInstruction,
    message::{MessageHeader, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};

/// Get the message header from a `VersionedMessage`.
#[inline]
#[must_use]
pub fn get_message_header(message: &VersionedMessage) -> &MessageHeader {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &legacy_msg.header,
        VersionedMessage::V0(v0_msg) => &v0_msg.header,
    }
}

/// Get the static account keys from a `VersionedMessage`.
///
/// For V0 messages this excludes addresses loaded from lookup tables.
/// Program ids are always static keys.
#[inline]
#[must_use]
pub fn get_static_account_keys(message: &VersionedMessage) -> &[Pubkey] {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &legacy_msg.account_keys,
        VersionedMessage::V0(v0_msg) => &v0_msg.account_keys,
    }
}

/// Get the required signers (always the first N static accounts).
#[inline]
#[must_use]
pub fn get_required_signers(message: &VersionedMessage) -> &[Pubkey] {
    let header = get_message_header(message);
    let account_keys = get_static_account_keys(message);
    let num_signers = header.num_required_signatures as usize;

    &account_keys[..num_signers.min(account_keys.len())]
}

/// Mutable access to the compiled instruction list.
///
/// Any mutation invalidates existing signatures.
#[inline]
pub fn get_instructions_mut(message: &mut VersionedMessage) -> &mut Vec<CompiledInstruction> {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &mut legacy_msg.instructions,
        VersionedMessage::V0(v0_msg) => &mut v0_msg.instructions,
    }
}

/// Index of `pubkey` among the required signers, if it must sign.
#[must_use]
pub fn signer_index(message: &VersionedMessage, pubkey: &Pubkey) -> Option<usize> {
    get_required_signers(message).iter().position(|k| k == pubkey)
}

/// The transaction id: the fee payer's signature, when present.
#[must_use]
pub fn first_signature(tx: &VersionedTransaction) -> Option<Signature> {
    tx.signatures
        .first()
        .copied()
        .filter(|sig| *sig != Signature::default())
}

/// True when any signature slot carries a real signature.
#[must_use]
pub fn has_any_signature(tx: &VersionedTransaction) -> bool {
    tx.signatures.iter().any(|sig| *sig != Signature::default())
}
