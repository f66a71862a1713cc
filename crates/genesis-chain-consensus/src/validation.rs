//! Block validation against its parent.
//!
//! Outcomes are values: `Ok(())` or the first reason the block fails.
//! Chain-level rules (the difficulty schedule and transaction uniqueness
//! across blocks) are enforced by [`crate::chain::Chain`] on top of this.

use genesis_chain_core::{Block, PublicKey, Verifier};
use std::collections::HashSet;

use crate::config::ChainConfig;
use crate::error::BlockError;

/// Validate `block` as the direct successor of `previous`.
///
/// This performs, in order:
/// - Index continuity and previous-hash linkage
/// - Non-decreasing timestamp
/// - Stored hash equals the recomputed header hash and meets `difficulty`
/// - Merkle root recomputed from the transactions
/// - Transaction ids match contents and are unique within the block
/// - Every transfer signature verifies against its sender
/// - Exactly one reward, in last position, paying subsidy plus fees
pub fn validate_block(
    block: &Block,
    previous: &Block,
    verifier: &dyn Verifier,
    config: &ChainConfig,
) -> Result<(), BlockError> {
    validate_header(block, previous)?;
    validate_transactions(block, verifier, config)
}

/// Boolean view of [`validate_block`].
pub fn is_valid_block(
    block: &Block,
    previous: &Block,
    verifier: &dyn Verifier,
    config: &ChainConfig,
) -> bool {
    validate_block(block, previous, verifier, config).is_ok()
}

/// Linkage, hash and proof-of-work checks. No signature work.
pub fn validate_header(block: &Block, previous: &Block) -> Result<(), BlockError> {
    let expected_index = previous.index + 1;
    if block.index != expected_index {
        return Err(BlockError::IndexMismatch {
            expected: expected_index,
            got: block.index,
        });
    }

    if block.previous_hash != previous.hash {
        return Err(BlockError::PreviousHashMismatch {
            expected: previous.hash,
            got: block.previous_hash,
        });
    }

    if block.timestamp < previous.timestamp {
        return Err(BlockError::TimestampRegression {
            parent: previous.timestamp,
            got: block.timestamp,
        });
    }

    let computed = block.compute_hash();
    if computed != block.hash {
        return Err(BlockError::HashMismatch {
            stored: block.hash,
            computed,
        });
    }

    let leading_zeros = block.hash.leading_zero_bits();
    if leading_zeros < block.difficulty {
        return Err(BlockError::InsufficientWork {
            difficulty: block.difficulty,
            leading_zeros,
        });
    }

    Ok(())
}

fn validate_transactions(
    block: &Block,
    verifier: &dyn Verifier,
    config: &ChainConfig,
) -> Result<(), BlockError> {
    if block.compute_merkle_root() != block.merkle_root {
        return Err(BlockError::MerkleRootMismatch);
    }

    let Some((reward, transfers)) = block.transactions.split_last() else {
        return Err(BlockError::MissingReward);
    };

    let mut seen = HashSet::with_capacity(block.transactions.len());
    for tx in &block.transactions {
        if tx.compute_id() != tx.id {
            return Err(BlockError::TransactionIdMismatch(tx.id));
        }
        if !seen.insert(tx.id) {
            return Err(BlockError::DuplicateTransaction(tx.id));
        }
    }

    let mut fees = 0u64;
    for tx in transfers {
        if tx.is_reward() {
            return Err(BlockError::MisplacedReward(tx.id));
        }
        if !tx.verify_signature(verifier) {
            return Err(BlockError::InvalidSignature(tx.id));
        }
        fees = fees.checked_add(tx.fee).ok_or(BlockError::AmountOverflow)?;
    }

    if !reward.is_reward() {
        return Err(BlockError::MissingReward);
    }
    if reward.sender != PublicKey::ZERO || reward.signature.is_some() || reward.fee != 0 {
        return Err(BlockError::MalformedReward(
            "reward must have zero sender, no fee and no signature".into(),
        ));
    }
    if reward.nonce != block.index {
        return Err(BlockError::MalformedReward(format!(
            "reward nonce {} does not match height {}",
            reward.nonce, block.index
        )));
    }

    let expected = config
        .mining_subsidy(block.index)
        .checked_add(fees)
        .ok_or(BlockError::AmountOverflow)?;
    if reward.amount != expected {
        return Err(BlockError::RewardAmountMismatch {
            expected,
            got: reward.amount,
        });
    }

    Ok(())
}
