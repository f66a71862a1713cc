//! Error types for the node.

use genesis_chain_accountability::LedgerError;
use genesis_chain_consensus::{ChainConflict, ConfigError, MiningError, PoolError};
use genesis_chain_core::TxId;
use genesis_chain_store::StoreError;
use thiserror::Error;

/// Errors that can occur during node operations.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// Configuration parsed but its chain parameters are unusable.
    #[error("invalid chain parameters: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// A submitted transaction failed its checks.
    #[error("invalid transaction {id:?}: {reason}")]
    InvalidTransaction { id: TxId, reason: &'static str },

    /// A submitted transaction is already on the main chain.
    #[error("transaction already confirmed: {0:?}")]
    AlreadyConfirmed(TxId),

    /// Pool rejected the transaction.
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),

    /// Mining failed or was aborted.
    #[error("mining error: {0}")]
    Mining(#[from] MiningError),

    /// A candidate chain was rejected.
    #[error("chain conflict: {0}")]
    Conflict(#[from] ChainConflict),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Ledger error.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    TaskFailed(String),
}

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;
