//! # GenesisChain Core
//!
//! Pure primitives for GenesisChain: digests, the 160-byte signature engine,
//! canonical encoding, transactions, blocks and statement records.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`SignatureEngine`] - Keypair generation, signing and verification
//! - [`Signature`] - Fixed 160-byte structured signature
//! - [`Transaction`] / [`Block`] - Chain data model
//! - [`StatementRecord`] - A signed statement in the accountability ledger
//!
//! ## Hashing
//!
//! `H` is Blake3-256 everywhere. Transaction and statement bytes use
//! deterministic CBOR, see the [`canonical`] module.

pub mod block;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod merkle;
pub mod signature;
pub mod statement;
pub mod transaction;
pub mod types;

pub use block::{transactions_root, Block, BlockHeader, GENESIS_TIMESTAMP};
pub use digest::{leading_zero_bits, random_bytes, Digest, EntropySource, OsEntropy};
pub use error::CoreError;
pub use merkle::{merkle_proof, merkle_root, verify_merkle_proof, MerkleProof};
pub use signature::{
    derive_public_key, verify_signature, ExpandedKey, KeyPair, PrivateKey, PublicKey, Signature,
    SignatureEngine, Signer, Verifier, SIGNATURE_LEN,
};
pub use statement::{
    derive_record_id, statement_hash, StatementMetadata, StatementRecord, TrustedSource,
};
pub use transaction::{Transaction, TransactionBuilder, TransactionKind, COIN};
pub use types::{now_millis, BlockHash, RecordId, TxId};
