//! Block assembly and mining.
//!
//! Selection policy: pending transactions are taken in arrival order (FIFO)
//! up to `max_transactions_per_block`. There is no fee priority. The reward
//! transaction is always last.

use genesis_chain_core::{
    now_millis, transactions_root, Block, BlockHeader, PublicKey, Transaction, TxId,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::chain::Chain;
use crate::error::MiningError;
use crate::pow::{search_nonce, CancelToken};

/// An unsealed block: header with nonce 0 plus its transactions.
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

/// The outcome of [`select_transactions`].
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Transactions for the block, in pending order.
    pub transactions: Vec<Transaction>,
    /// Transactions that can never be mined and should leave the pool.
    pub rejected: Vec<TxId>,
}

/// Pick transactions for the next block, in order.
///
/// Skips (with a warning) rewards, transactions whose id does not match
/// their contents, duplicates, transactions already on the chain, and
/// transactions whose signature fails. Every skipped transaction except an
/// in-batch duplicate is listed in `rejected`; the duplicate's first copy
/// was selected. Transactions past the per-block cap are not examined.
pub fn select_transactions(chain: &Chain, pending: &[Transaction]) -> Selection {
    let max = chain.config().max_transactions_per_block;
    let mut selection = Selection {
        transactions: Vec::with_capacity(max.min(pending.len())),
        rejected: Vec::new(),
    };
    let mut seen: HashSet<TxId> = HashSet::new();

    for tx in pending {
        if selection.transactions.len() >= max {
            break;
        }
        if seen.contains(&tx.id) {
            warn!(tx = ?tx.id, reason = "duplicate in block", "skipping transaction");
            continue;
        }
        let reason = if tx.is_reward() {
            Some("reward in pending set")
        } else if tx.compute_id() != tx.id {
            Some("id does not match contents")
        } else if chain.contains_transaction(&tx.id) {
            Some("already confirmed")
        } else if !tx.verify_signature(chain.verifier()) {
            Some("invalid signature")
        } else {
            None
        };

        match reason {
            Some(reason) => {
                warn!(tx = ?tx.id, reason, "rejecting transaction");
                selection.rejected.push(tx.id);
            }
            None => {
                seen.insert(tx.id);
                selection.transactions.push(tx.clone());
            }
        }
    }
    selection
}

/// Assemble the next block on the current tip.
///
/// `timestamp` is raised to the parent's timestamp if it is earlier.
pub fn build_template(
    chain: &Chain,
    pending: &[Transaction],
    reward_address: PublicKey,
    timestamp: i64,
) -> Result<BlockTemplate, MiningError> {
    let blocks = chain.blocks();
    let parent = blocks.last().cloned().unwrap_or_else(|| chain.genesis());
    let index = parent.index + 1;
    let timestamp = timestamp.max(parent.timestamp);
    let config = chain.config();

    let mut transactions = select_transactions(chain, pending).transactions;
    if transactions.is_empty() && !config.allow_empty_blocks {
        return Err(MiningError::NoTransactions);
    }

    let fees = transactions
        .iter()
        .try_fold(0u64, |acc, tx| acc.checked_add(tx.fee))
        .ok_or(MiningError::RewardOverflow)?;
    let reward_amount = config
        .mining_subsidy(index)
        .checked_add(fees)
        .ok_or(MiningError::RewardOverflow)?;
    transactions.push(Transaction::reward(
        reward_address,
        reward_amount,
        index,
        timestamp,
    ));

    let difficulty =
        crate::difficulty::expected_difficulty(blocks.as_slice(), index, config);

    Ok(BlockTemplate {
        header: BlockHeader {
            index,
            previous_hash: parent.hash,
            merkle_root: transactions_root(&transactions),
            timestamp,
            nonce: 0,
            difficulty,
        },
        transactions,
    })
}

/// Run the nonce search on `template` and return the sealed block.
pub fn seal_template(
    template: BlockTemplate,
    cancel: &CancelToken,
    check_interval: u64,
) -> Result<Block, MiningError> {
    let mut header = template.header;
    let solution = search_nonce(&header, cancel, check_interval)?;
    header.nonce = solution.nonce;
    Ok(Block::from_header(header, template.transactions))
}

/// Mine `pending` into a block paying `reward_address` and append it.
///
/// Works from an immutable snapshot and holds no chain lock during the
/// search. If another block extended the same parent first, the mined block
/// is discarded and `StaleParent` is returned.
pub fn mine(
    chain: &Chain,
    pending: &[Transaction],
    reward_address: PublicKey,
    cancel: &CancelToken,
) -> Result<Arc<Block>, MiningError> {
    let template = build_template(chain, pending, reward_address, now_millis())?;
    let started = std::time::Instant::now();
    let block = seal_template(template, cancel, chain.config().cancel_check_interval)?;

    info!(
        index = block.index,
        nonce = block.nonce,
        difficulty = block.difficulty,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "mined block"
    );

    Ok(chain.append(block)?)
}
