//! The Node: unified API for GenesisChain.
//!
//! A node owns one signature cache and shares it between the chain (for
//! transaction signatures) and the accountability ledger (for statement
//! signatures). Blocks and the main chain index are persisted through the
//! store so a node can be restored after restart.

use std::sync::Arc;

use genesis_chain_accountability::{AccountabilityLedger, NewStatement, RecordVerification};
use genesis_chain_consensus::{
    mining, CancelToken, Chain, MemoryPool, ReorgOutcome, TransactionPool,
};
use genesis_chain_core::{
    Block, BlockHash, PrivateKey, PublicKey, RecordId, StatementRecord, Transaction, TrustedSource, TxId,
};
use genesis_chain_sigcache::SignatureCache;
use genesis_chain_store::{BlockStore, RecordStore, SourceRegistry};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::NodeConfig;
use crate::error::{NodeError, Result};

/// Everything a node needs from its storage backend.
pub trait NodeStore: RecordStore + SourceRegistry + BlockStore + 'static {}

impl<T: RecordStore + SourceRegistry + BlockStore + 'static> NodeStore for T {}

/// The main Node struct.
///
/// Provides a unified API for:
/// - Submitting and mining transactions
/// - Resolving conflicts with competing chains
/// - Recording and verifying statements
/// - Restoring chain state from storage
pub struct Node<S: NodeStore> {
    store: Arc<S>,
    chain: Arc<Chain>,
    cache: Arc<SignatureCache>,
    pool: Arc<MemoryPool>,
    ledger: AccountabilityLedger<Arc<S>, Arc<S>, SignatureCache>,
    config: NodeConfig,
    /// Main chain index as last written to the store. Its lock serializes
    /// persistence.
    persisted: Mutex<Vec<BlockHash>>,
}

impl<S: NodeStore> Node<S> {
    /// Create a node with only the genesis block in memory. Does no I/O.
    pub fn new(store: S, config: NodeConfig) -> Self {
        let store = Arc::new(store);
        let cache = Arc::new(SignatureCache::new(&config.cache));
        let chain = Arc::new(Chain::new(config.chain.clone(), cache.clone()));
        let ledger = AccountabilityLedger::with_crypto(store.clone(), store.clone(), cache.clone());

        Self {
            store,
            chain,
            cache,
            pool: Arc::new(MemoryPool::new()),
            ledger,
            config,
            persisted: Mutex::new(Vec::new()),
        }
    }

    /// Create a node and load the persisted main chain, if any.
    ///
    /// A store with no main chain is initialized with the genesis block.
    /// Fails without touching the store if the chain parameters are unusable.
    pub async fn open(store: S, config: NodeConfig) -> Result<Self> {
        config.chain.validate()?;
        let node = Self::new(store, config);
        if node.restore().await?.is_none() {
            node.persist_main_chain().await?;
        }
        Ok(node)
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn cache(&self) -> &SignatureCache {
        &self.cache
    }

    pub fn pool(&self) -> &MemoryPool {
        &self.pool
    }

    pub fn ledger(&self) -> &AccountabilityLedger<Arc<S>, Arc<S>, SignatureCache> {
        &self.ledger
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Chain Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a transaction to the pending pool.
    pub async fn submit_transaction(&self, tx: Transaction) -> Result<TxId> {
        if self.config.verify_on_submit {
            let reason = if tx.is_reward() {
                None
            } else if tx.compute_id() != tx.id {
                Some("id does not match contents")
            } else if !tx.verify_signature(self.cache.as_ref()) {
                Some("invalid signature")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(NodeError::InvalidTransaction { id: tx.id, reason });
            }
        }
        if self.chain.contains_transaction(&tx.id) {
            return Err(NodeError::AlreadyConfirmed(tx.id));
        }

        let id = tx.id;
        self.pool.submit(tx)?;
        debug!(tx = ?id, pending = self.pool.len(), "accepted transaction");
        Ok(id)
    }

    /// Mine the pending pool into a block paying `reward_address`.
    ///
    /// The nonce search runs on the blocking pool. On success the block is
    /// persisted, the main chain index updated, and its transactions leave
    /// the pool. Pending transactions that can never be mined are dropped
    /// from the pool whether or not mining succeeds.
    pub async fn mine(&self, reward_address: PublicKey, cancel: &CancelToken) -> Result<Arc<Block>> {
        let pending = self.pool.take_pending();
        let chain = Arc::clone(&self.chain);
        let cancel = cancel.clone();

        let (rejected, mined) = tokio::task::spawn_blocking(move || {
            let selection = mining::select_transactions(&chain, &pending);
            let mined = mining::mine(&chain, &selection.transactions, reward_address, &cancel);
            (selection.rejected, mined)
        })
        .await
        .map_err(|e| NodeError::TaskFailed(e.to_string()))?;

        if !rejected.is_empty() {
            self.pool.remove(&rejected);
            debug!(
                dropped = rejected.len(),
                pending = self.pool.len(),
                "dropped unminable transactions"
            );
        }
        let block = mined?;

        self.persist_main_chain().await?;
        self.prune_pool(std::slice::from_ref(&block));

        info!(
            index = block.index,
            hash = %block.hash,
            transactions = block.transactions.len(),
            "persisted mined block"
        );
        Ok(block)
    }

    /// Adopt `candidate` if it is a longer valid chain from our genesis.
    ///
    /// Adopted blocks are persisted and their transactions leave the pool.
    /// Transactions from orphaned blocks are not returned to the pool.
    pub async fn resolve_conflict(&self, candidate: Vec<Block>) -> Result<ReorgOutcome> {
        let chain = Arc::clone(&self.chain);
        let outcome = tokio::task::spawn_blocking(move || chain.resolve_conflict(&candidate))
            .await
            .map_err(|e| NodeError::TaskFailed(e.to_string()))??;

        self.persist_main_chain().await?;
        self.prune_pool(&outcome.adopted);
        Ok(outcome)
    }

    /// Rebuild the in-memory chain from the persisted main chain.
    ///
    /// Returns `None` when the store holds nothing longer than the current
    /// chain. The stored blocks are revalidated in full.
    pub async fn restore(&self) -> Result<Option<ReorgOutcome>> {
        let stored = self.store.main_chain().await?;
        if stored.len() <= self.chain.len() {
            debug!(stored = stored.len(), "nothing to restore");
            return Ok(None);
        }

        let outcome = self.resolve_conflict(stored).await?;
        info!(height = self.chain.height(), "restored chain from store");
        Ok(Some(outcome))
    }

    pub fn balance(&self, address: &PublicKey) -> i128 {
        self.chain.balance(address)
    }

    pub fn height(&self) -> u64 {
        self.chain.height()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ledger Operations
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn register_source(&self, source: &TrustedSource) -> Result<()> {
        Ok(self.ledger.register_source(source).await?)
    }

    pub async fn record_statement(
        &self,
        statement: NewStatement,
        source_private_key: &PrivateKey,
    ) -> Result<StatementRecord> {
        Ok(self
            .ledger
            .record_statement(statement, source_private_key)
            .await?)
    }

    pub async fn verify_record(&self, record_id: &RecordId) -> Result<RecordVerification> {
        Ok(self.ledger.verify(record_id).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    /// Bring the stored main chain in line with the in-memory chain.
    ///
    /// Stores every block past the point where the two diverge, then
    /// rewrites the index. The chain is read under the lock, so the last
    /// writer always stores the newest snapshot.
    async fn persist_main_chain(&self) -> Result<()> {
        let mut persisted = self.persisted.lock().await;
        let blocks = self.chain.blocks();

        let shared = persisted
            .iter()
            .zip(blocks.iter())
            .take_while(|(stored, current)| **stored == current.hash)
            .count();
        if shared == blocks.len() && shared == persisted.len() {
            return Ok(());
        }

        for block in &blocks[shared..] {
            self.store.put_block(block).await?;
        }
        let hashes: Vec<BlockHash> = blocks.iter().map(|b| b.hash).collect();
        self.store.set_main_chain(&hashes).await?;
        debug!(from = shared, height = hashes.len() - 1, "persisted main chain");
        *persisted = hashes;
        Ok(())
    }

    fn prune_pool(&self, blocks: &[Arc<Block>]) {
        let ids: Vec<TxId> = blocks
            .iter()
            .flat_map(|b| b.transactions.iter().map(|tx| tx.id))
            .collect();
        self.pool.remove(&ids);
    }
}
