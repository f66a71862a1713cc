//! Pending transaction pool.

use genesis_chain_core::{Transaction, TxId};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("transaction already pending: {0:?}")]
    Duplicate(TxId),

    #[error("reward transactions are created by miners, not submitted")]
    RewardNotAccepted,
}

/// Source of pending transactions for mining.
pub trait TransactionPool: Send + Sync {
    /// Add a transaction. Duplicate ids are rejected.
    fn submit(&self, tx: Transaction) -> Result<(), PoolError>;

    /// All pending transactions in selection order. Does not remove them.
    fn take_pending(&self) -> Vec<Transaction>;

    /// Drop transactions that were included in a block.
    fn remove(&self, ids: &[TxId]);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
struct PoolInner {
    queue: VecDeque<Transaction>,
    ids: HashSet<TxId>,
}

/// In-memory pool ordered by arrival.
#[derive(Default)]
pub struct MemoryPool {
    inner: Mutex<PoolInner>,
}

impl MemoryPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &TxId) -> bool {
        self.inner.lock().ids.contains(id)
    }
}

impl TransactionPool for MemoryPool {
    fn submit(&self, tx: Transaction) -> Result<(), PoolError> {
        if tx.is_reward() {
            return Err(PoolError::RewardNotAccepted);
        }
        let mut inner = self.inner.lock();
        if !inner.ids.insert(tx.id) {
            return Err(PoolError::Duplicate(tx.id));
        }
        inner.queue.push_back(tx);
        Ok(())
    }

    fn take_pending(&self) -> Vec<Transaction> {
        self.inner.lock().queue.iter().cloned().collect()
    }

    fn remove(&self, ids: &[TxId]) {
        let drop: HashSet<&TxId> = ids.iter().collect();
        let mut inner = self.inner.lock();
        inner.queue.retain(|tx| !drop.contains(&tx.id));
        for id in ids {
            inner.ids.remove(id);
        }
    }

    fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }
}
