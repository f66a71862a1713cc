//! Chain state: a block arena plus the active main chain.
//!
//! Blocks live in an arena keyed by hash and are never mutated. The arena
//! holds exactly the main chain's blocks; a reorg drops the orphaned ones.
//! The main chain is an `Arc` snapshot of block pointers; readers clone the snapshot
//! and never block writers for long. Appends and reorgs replace the
//! snapshot inside a short write section after checking that the tip they
//! validated against is still the tip.

use genesis_chain_core::{Block, BlockHash, PublicKey, Transaction, TxId, Verifier};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ChainConfig;
use crate::difficulty::expected_difficulty;
use crate::error::{AppendError, BlockError, ChainConflict};
use crate::validation::validate_block;

/// Lifecycle of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainState {
    /// Only the genesis block.
    Genesis,
    /// At least one block appended.
    Extending,
    /// A candidate chain is being validated.
    ReorgPending,
}

/// Where a transaction sits on the main chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxLocation {
    pub height: u64,
    pub position: usize,
}

/// Result of adopting a candidate chain.
#[derive(Debug, Clone)]
pub struct ReorgOutcome {
    /// Height of the last block shared by both chains.
    pub fork_height: u64,
    pub old_tip: BlockHash,
    pub new_tip: BlockHash,
    /// Blocks now on the main chain that were not before, oldest first.
    pub adopted: Vec<Arc<Block>>,
    /// Blocks that left the main chain, oldest first.
    pub orphaned: Vec<Arc<Block>>,
}

#[derive(Clone)]
struct MainChain {
    blocks: Arc<Vec<Arc<Block>>>,
    tip: Arc<Block>,
    tx_index: Arc<HashMap<TxId, TxLocation>>,
    state: ChainState,
}

impl MainChain {
    fn from_blocks(blocks: Vec<Arc<Block>>, tip: Arc<Block>) -> Self {
        let tx_index = index_transactions(&blocks);
        let state = settled_state(blocks.len());
        Self {
            blocks: Arc::new(blocks),
            tip,
            tx_index: Arc::new(tx_index),
            state,
        }
    }
}

fn settled_state(len: usize) -> ChainState {
    if len <= 1 {
        ChainState::Genesis
    } else {
        ChainState::Extending
    }
}

fn index_transactions(blocks: &[Arc<Block>]) -> HashMap<TxId, TxLocation> {
    let mut index = HashMap::new();
    for block in blocks {
        for (position, tx) in block.transactions.iter().enumerate() {
            index.insert(
                tx.id,
                TxLocation {
                    height: block.index,
                    position,
                },
            );
        }
    }
    index
}

/// The chain validator's state machine.
pub struct Chain {
    config: ChainConfig,
    verifier: Arc<dyn Verifier>,
    arena: RwLock<HashMap<BlockHash, Arc<Block>>>,
    main: RwLock<MainChain>,
    reorg: Mutex<()>,
}

impl Chain {
    /// A chain holding only the genesis block.
    pub fn new(config: ChainConfig, verifier: Arc<dyn Verifier>) -> Self {
        let genesis = Arc::new(Block::genesis());
        let mut arena = HashMap::new();
        arena.insert(genesis.hash, Arc::clone(&genesis));

        Self {
            config,
            verifier,
            arena: RwLock::new(arena),
            main: RwLock::new(MainChain::from_blocks(vec![Arc::clone(&genesis)], genesis)),
            reorg: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn verifier(&self) -> &dyn Verifier {
        self.verifier.as_ref()
    }

    pub fn state(&self) -> ChainState {
        self.main.read().state
    }

    pub fn genesis(&self) -> Arc<Block> {
        Arc::clone(&self.main.read().blocks[0])
    }

    pub fn tip(&self) -> Arc<Block> {
        Arc::clone(&self.main.read().tip)
    }

    /// Index of the tip block.
    pub fn height(&self) -> u64 {
        self.main.read().tip.index
    }

    /// Number of blocks on the main chain, genesis included.
    pub fn len(&self) -> usize {
        self.main.read().blocks.len()
    }

    /// Always false: genesis is always present.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Snapshot of the main chain, genesis first.
    pub fn blocks(&self) -> Arc<Vec<Arc<Block>>> {
        Arc::clone(&self.main.read().blocks)
    }

    pub fn block_at(&self, index: u64) -> Option<Arc<Block>> {
        self.main.read().blocks.get(index as usize).cloned()
    }

    /// A main chain block by hash. Orphaned blocks are not kept.
    pub fn block_by_hash(&self, hash: &BlockHash) -> Option<Arc<Block>> {
        self.arena.read().get(hash).cloned()
    }

    pub fn contains_transaction(&self, id: &TxId) -> bool {
        self.main.read().tx_index.contains_key(id)
    }

    /// A confirmed transaction and its location.
    pub fn transaction(&self, id: &TxId) -> Option<(Transaction, TxLocation)> {
        let main = self.main.read().clone();
        let location = *main.tx_index.get(id)?;
        let block = main.blocks.get(location.height as usize)?;
        let tx = block.transactions.get(location.position)?.clone();
        Some((tx, location))
    }

    /// Received minus sent minus fees paid, over the main chain.
    ///
    /// Signed so an overspent account shows up as negative rather than
    /// wrapping.
    pub fn balance(&self, address: &PublicKey) -> i128 {
        let blocks = self.blocks();
        let mut balance: i128 = 0;
        for block in blocks.iter() {
            for tx in &block.transactions {
                if tx.recipient == *address {
                    balance += tx.amount as i128;
                }
                if !tx.is_reward() && tx.sender == *address {
                    balance -= tx.amount as i128 + tx.fee as i128;
                }
            }
        }
        balance
    }

    /// Confirmed transactions touching `address`, oldest first, with their height.
    pub fn transaction_history(&self, address: &PublicKey) -> Vec<(u64, Transaction)> {
        let blocks = self.blocks();
        let mut history = Vec::new();
        for block in blocks.iter() {
            for tx in &block.transactions {
                if tx.recipient == *address || (!tx.is_reward() && tx.sender == *address) {
                    history.push((block.index, tx.clone()));
                }
            }
        }
        history
    }

    /// Difficulty the next block must carry.
    pub fn next_difficulty(&self) -> u32 {
        let blocks = self.blocks();
        expected_difficulty(blocks.as_slice(), blocks.len() as u64, &self.config)
    }

    /// Append `block` on the current tip.
    ///
    /// Validation runs against a snapshot without holding any lock. The
    /// commit then succeeds only if the tip is still the block's parent;
    /// otherwise the block is discarded with `StaleParent`.
    pub fn append(&self, block: Block) -> Result<Arc<Block>, AppendError> {
        let snapshot = self.main.read().clone();
        let parent = Arc::clone(&snapshot.tip);

        if block.previous_hash != parent.hash {
            warn!(
                index = block.index,
                parent = ?block.previous_hash,
                tip = ?parent.hash,
                "rejected block on stale parent"
            );
            return Err(AppendError::StaleParent {
                parent: block.previous_hash,
                tip: parent.hash,
            });
        }

        self.validate_extension(&snapshot.blocks, &block, |id| {
            snapshot.tx_index.contains_key(id)
        })?;

        let block = Arc::new(block);
        {
            let mut main = self.main.write();
            if main.tip.hash != parent.hash {
                warn!(
                    index = block.index,
                    tip = ?main.tip.hash,
                    "lost append race"
                );
                return Err(AppendError::StaleParent {
                    parent: parent.hash,
                    tip: main.tip.hash,
                });
            }

            let height = block.index;
            let tx_index = Arc::make_mut(&mut main.tx_index);
            for (position, tx) in block.transactions.iter().enumerate() {
                tx_index.insert(tx.id, TxLocation { height, position });
            }
            Arc::make_mut(&mut main.blocks).push(Arc::clone(&block));
            main.tip = Arc::clone(&block);
            if main.state == ChainState::Genesis {
                main.state = ChainState::Extending;
            }
            // Lock order: main, then arena.
            self.arena.write().insert(block.hash, Arc::clone(&block));
        }

        info!(
            index = block.index,
            hash = ?block.hash,
            transactions = block.transactions.len(),
            difficulty = block.difficulty,
            "appended block"
        );
        Ok(block)
    }

    /// Replace the main chain with `candidate` if it is strictly longer,
    /// starts at our genesis, and every block after the last shared one is
    /// valid under the full chain rules.
    ///
    /// All-or-nothing: on any rejection the main chain is left exactly as it
    /// was. Concurrent calls are serialized.
    pub fn resolve_conflict(&self, candidate: &[Block]) -> Result<ReorgOutcome, ChainConflict> {
        let _serial = self.reorg.lock();
        let snapshot = self.main.read().clone();

        let result = self.check_candidate(&snapshot, candidate);
        let (fork_height, working) = match result {
            Ok(found) => found,
            Err(conflict) => {
                warn!(
                    candidate_len = candidate.len(),
                    current_len = snapshot.blocks.len(),
                    %conflict,
                    "rejected candidate chain"
                );
                self.settle_state();
                return Err(conflict);
            }
        };

        let new_tip = Arc::clone(&working[working.len() - 1]);
        let adopted: Vec<Arc<Block>> = working[fork_height as usize + 1..].to_vec();
        let orphaned: Vec<Arc<Block>> = snapshot.blocks[fork_height as usize + 1..].to_vec();

        {
            let mut main = self.main.write();
            if main.tip.hash != snapshot.tip.hash {
                main.state = settled_state(main.blocks.len());
                warn!("chain advanced during candidate validation");
                return Err(ChainConflict::ChainAdvanced);
            }
            *main = MainChain::from_blocks(working, Arc::clone(&new_tip));

            let mut arena = self.arena.write();
            for block in &orphaned {
                arena.remove(&block.hash);
            }
            for block in &adopted {
                arena.insert(block.hash, Arc::clone(block));
            }
        }

        info!(
            fork_height,
            old_tip = ?snapshot.tip.hash,
            new_tip = ?new_tip.hash,
            adopted = adopted.len(),
            orphaned = orphaned.len(),
            "adopted longer chain"
        );

        Ok(ReorgOutcome {
            fork_height,
            old_tip: snapshot.tip.hash,
            new_tip: new_tip.hash,
            adopted,
            orphaned,
        })
    }

    /// Validate `candidate` against `snapshot`, returning the fork height and
    /// the full replacement chain.
    fn check_candidate(
        &self,
        snapshot: &MainChain,
        candidate: &[Block],
    ) -> Result<(u64, Vec<Arc<Block>>), ChainConflict> {
        let Some(candidate_genesis) = candidate.first() else {
            return Err(ChainConflict::Empty);
        };
        let our_genesis = &snapshot.blocks[0];
        if candidate_genesis.hash != our_genesis.hash
            || candidate_genesis.compute_hash() != candidate_genesis.hash
            || **our_genesis != *candidate_genesis
        {
            return Err(ChainConflict::GenesisMismatch);
        }

        if candidate.len() <= snapshot.blocks.len() {
            return Err(ChainConflict::NotLonger {
                candidate: candidate.len(),
                current: snapshot.blocks.len(),
            });
        }

        self.main.write().state = ChainState::ReorgPending;

        let fork_height = candidate
            .iter()
            .zip(snapshot.blocks.iter())
            .take_while(|(ours, theirs)| ours.hash == theirs.hash)
            .count()
            - 1;

        let mut working: Vec<Arc<Block>> = snapshot.blocks[..=fork_height].to_vec();
        let mut seen: HashSet<TxId> = working
            .iter()
            .flat_map(|b| b.transactions.iter().map(|tx| tx.id))
            .collect();

        for block in &candidate[fork_height + 1..] {
            self.validate_extension(&working, block, |id| seen.contains(id))
                .map_err(|source| ChainConflict::InvalidBlock {
                    index: block.index,
                    source,
                })?;
            seen.extend(block.transactions.iter().map(|tx| tx.id));
            working.push(Arc::new(block.clone()));
        }

        Ok((fork_height as u64, working))
    }

    /// Full rules for `block` as the successor of `chain`'s last block.
    fn validate_extension(
        &self,
        chain: &[Arc<Block>],
        block: &Block,
        already_confirmed: impl Fn(&TxId) -> bool,
    ) -> Result<(), BlockError> {
        let Some(parent) = chain.last() else {
            return Err(BlockError::IndexMismatch {
                expected: 0,
                got: block.index,
            });
        };
        validate_block(block, parent, self.verifier.as_ref(), &self.config)?;

        let expected = expected_difficulty(chain, block.index, &self.config);
        if block.difficulty != expected {
            return Err(BlockError::DifficultyMismatch {
                expected,
                got: block.difficulty,
            });
        }

        if let Some(tx) = block.transactions.iter().find(|tx| already_confirmed(&tx.id)) {
            return Err(BlockError::DuplicateTransaction(tx.id));
        }
        Ok(())
    }

    fn settle_state(&self) {
        let mut main = self.main.write();
        main.state = settled_state(main.blocks.len());
    }
}
