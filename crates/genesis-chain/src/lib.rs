//! # GenesisChain
//!
//! The unified API for GenesisChain: a proof-of-work chain of signed
//! transfers plus an accountability ledger of signed statements, both
//! resting on the same 160-byte structured signature.
//!
//! ## Overview
//!
//! - **Signatures**: Ed25519 core bound to fresh entropy and to the hashes of
//!   the signer's public key and the message
//! - **Signature cache**: memoized verification and parallel batch checks
//! - **Chain**: Merkle-committed blocks, proof-of-work, difficulty
//!   retargeting and longest-valid-chain conflict resolution
//! - **Ledger**: statements signed by registered sources, re-verifiable
//!   from their record id
//!
//! ## Usage
//!
//! ```rust,no_run
//! use genesis_chain::{Node, NodeConfig};
//! use genesis_chain::consensus::CancelToken;
//! use genesis_chain::core::KeyPair;
//! use genesis_chain::store::SqliteStore;
//!
//! async fn example() {
//!     let store = SqliteStore::open("genesis.db").unwrap();
//!     let node = Node::open(store, NodeConfig::default()).await.unwrap();
//!
//!     let miner = KeyPair::from_seed(&[7; 32]);
//!     // node.submit_transaction(tx).await.unwrap();
//!     let block = node.mine(miner.public_key(), &CancelToken::new()).await;
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `genesis_chain::core` - Primitives (signatures, transactions, blocks)
//! - `genesis_chain::sigcache` - Signature cache
//! - `genesis_chain::consensus` - Mining, validation and the chain
//! - `genesis_chain::store` - Persistence traits and SQLite
//! - `genesis_chain::accountability` - Statement ledger

pub mod config;
pub mod error;
pub mod node;

pub use genesis_chain_accountability as accountability;
pub use genesis_chain_consensus as consensus;
pub use genesis_chain_core as core;
pub use genesis_chain_sigcache as sigcache;
pub use genesis_chain_store as store;

pub use config::NodeConfig;
pub use error::{NodeError, Result};
pub use node::{Node, NodeStore};

pub use genesis_chain_core::{
    Block, KeyPair, PublicKey, Signature, SignatureEngine, Transaction, TransactionBuilder, TxId,
};
