//! Error types for chain validation, conflict resolution and mining.

use genesis_chain_core::{BlockHash, TxId};
use thiserror::Error;

/// Why a block was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    #[error("index mismatch: expected {expected}, got {got}")]
    IndexMismatch { expected: u64, got: u64 },

    #[error("previous hash mismatch: expected {expected:?}, got {got:?}")]
    PreviousHashMismatch { expected: BlockHash, got: BlockHash },

    #[error("timestamp {got} precedes parent timestamp {parent}")]
    TimestampRegression { parent: i64, got: i64 },

    #[error("stored hash {stored:?} does not match computed {computed:?}")]
    HashMismatch { stored: BlockHash, computed: BlockHash },

    #[error("hash has {leading_zeros} leading zero bits, difficulty requires {difficulty}")]
    InsufficientWork { difficulty: u32, leading_zeros: u32 },

    #[error("difficulty mismatch: expected {expected}, got {got}")]
    DifficultyMismatch { expected: u32, got: u32 },

    #[error("merkle root does not match transactions")]
    MerkleRootMismatch,

    #[error("transaction id does not match its contents: {0:?}")]
    TransactionIdMismatch(TxId),

    #[error("duplicate transaction: {0:?}")]
    DuplicateTransaction(TxId),

    #[error("invalid transaction signature: {0:?}")]
    InvalidSignature(TxId),

    #[error("block has no reward transaction")]
    MissingReward,

    #[error("reward transaction must be last: {0:?}")]
    MisplacedReward(TxId),

    #[error("malformed reward transaction: {0}")]
    MalformedReward(String),

    #[error("reward amount mismatch: expected {expected}, got {got}")]
    RewardAmountMismatch { expected: u64, got: u64 },

    #[error("fee or reward arithmetic overflowed")]
    AmountOverflow,
}

/// Why a candidate chain was not adopted. The active chain is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainConflict {
    #[error("candidate chain is empty")]
    Empty,

    #[error("candidate does not share our genesis block")]
    GenesisMismatch,

    #[error("candidate length {candidate} is not longer than current length {current}")]
    NotLonger { candidate: usize, current: usize },

    #[error("candidate block {index} is invalid: {source}")]
    InvalidBlock {
        index: u64,
        #[source]
        source: BlockError,
    },

    #[error("chain advanced while the candidate was being validated")]
    ChainAdvanced,
}

/// Why an append was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppendError {
    #[error("invalid block: {0}")]
    Invalid(#[from] BlockError),

    /// Another block extended the parent first.
    #[error("stale parent {parent:?}, tip is {tip:?}")]
    StaleParent { parent: BlockHash, tip: BlockHash },
}

/// Mining failures. Reported to the caller, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MiningError {
    #[error("no transactions to mine")]
    NoTransactions,

    #[error("reward amount overflowed")]
    RewardOverflow,

    #[error("mining aborted")]
    Aborted,

    #[error("nonce space exhausted without meeting difficulty")]
    NonceSpaceExhausted,

    #[error("stale parent {parent:?}, tip is {tip:?}")]
    StaleParent { parent: BlockHash, tip: BlockHash },

    #[error("mined block rejected: {0}")]
    Rejected(#[from] BlockError),
}

impl From<AppendError> for MiningError {
    fn from(e: AppendError) -> Self {
        match e {
            AppendError::Invalid(err) => MiningError::Rejected(err),
            AppendError::StaleParent { parent, tip } => MiningError::StaleParent { parent, tip },
        }
    }
}

/// A [`crate::ChainConfig`] that cannot drive a chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A window of fewer than two blocks has no interval to measure.
    #[error("retarget window must be at least 2 blocks, got {0}")]
    RetargetWindowTooSmall(u64),

    #[error("min difficulty {min} exceeds max difficulty {max}")]
    DifficultyBounds { min: u32, max: u32 },

    #[error("initial difficulty {initial} is outside [{min}, {max}]")]
    InitialDifficultyOutOfBounds { initial: u32, min: u32, max: u32 },

    /// Hashes have 256 bits.
    #[error("max difficulty {0} exceeds 256 bits")]
    DifficultyTooHigh(u32),
}
