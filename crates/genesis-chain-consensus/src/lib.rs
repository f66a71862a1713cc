//! # GenesisChain Consensus
//!
//! Proof-of-work mining, difficulty retargeting, block validation and the
//! main chain with longest-valid-chain conflict resolution.
//!
//! ## Concurrency
//!
//! [`Chain`] is safe to share across threads. Readers get immutable
//! snapshots. Mining works on a template outside any lock and commits with a
//! compare-and-swap on the tip, so a miner that loses the race gets
//! [`MiningError::StaleParent`] instead of corrupting the chain.
//!
//! Signature checks go through an injected [`genesis_chain_core::Verifier`],
//! typically a shared signature cache.

pub mod chain;
pub mod config;
pub mod difficulty;
pub mod error;
pub mod mining;
pub mod pool;
pub mod pow;
pub mod validation;

pub use chain::{Chain, ChainState, ReorgOutcome, TxLocation};
pub use config::{mining_subsidy, ChainConfig};
pub use difficulty::{expected_difficulty, retarget_difficulty, RetargetParams};
pub use error::{AppendError, BlockError, ChainConflict, ConfigError, MiningError};
pub use mining::{
    build_template, mine, seal_template, select_transactions, BlockTemplate, Selection,
};
pub use pool::{MemoryPool, PoolError, TransactionPool};
pub use pow::{meets_difficulty, search_nonce, CancelToken, Solution};
pub use validation::{is_valid_block, validate_block, validate_header};
