//! # GenesisChain Signature Cache
//!
//! A performance layer over the signature engine. It memoizes public key
//! derivation and verification outcomes in bounded LRU caches and verifies
//! batches in parallel.
//!
//! The cache never changes an accept/reject outcome: every miss falls through
//! to [`genesis_chain_core::verify_signature`], and both outcomes are stored.
//!
//! Instances are constructed explicitly and injected where needed; nothing
//! here is process-global.

pub mod cache;
pub mod config;
pub mod shard;
pub mod stats;

pub use cache::{BatchItem, SignatureCache, VerificationKey};
pub use config::CacheConfig;
pub use stats::CacheStats;
