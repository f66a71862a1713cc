//! # GenesisChain Testkit
//!
//! Testing utilities for GenesisChain.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Signature vectors**: Reproducible signatures under a fixed entropy source
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Parties with deterministic keys, and chains mined at test
//!   difficulty
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use genesis_chain_testkit::generators::{TransferParams, transfer_from_params};
//!
//! proptest! {
//!     #[test]
//!     fn id_is_deterministic(params: TransferParams) {
//!         let a = transfer_from_params(&params);
//!         let b = transfer_from_params(&params);
//!         prop_assert_eq!(a.id, b.id);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use genesis_chain_testkit::fixtures::{fork_of, ChainFixture};
//!
//! let fixture = ChainFixture::new();
//! fixture.mine_empty(2).unwrap();
//! let longer = fork_of(&fixture.blocks(), 1, 3);
//! assert!(fixture.chain.resolve_conflict(&longer).is_ok());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{fork_of, multi_party_fixtures, ChainFixture, FailingEntropy, FixedEntropy, TestFixture};
pub use generators::{transfer_from_params, TransferParams};
pub use vectors::{all_vectors, sign_vector, verify_all_vectors, SignatureVector};
