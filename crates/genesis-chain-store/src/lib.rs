//! # GenesisChain Store
//!
//! Persistence interfaces for GenesisChain, with SQLite and in-memory
//! implementations.
//!
//! ## Key Types
//!
//! - [`RecordStore`] - Append-only statement records
//! - [`SourceRegistry`] - Trusted sources and their public keys
//! - [`BlockStore`] - Block bodies and the main chain index
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use genesis_chain_store::{BlockStore, SqliteStore};
//! use genesis_chain_core::Block;
//!
//! async fn example() {
//!     let store = SqliteStore::open("genesis.db").unwrap();
//!     let genesis = Block::genesis();
//!     store.put_block(&genesis).await.unwrap();
//!     store.set_main_chain(&[genesis.hash]).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent inserts**: Inserting the same record or block twice returns
//!   `AlreadyExists`
//! - **Blocks outlive reorgs**: `set_main_chain` rewrites only the index

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{BlockStore, InsertResult, RecordStore, SourceRegistry};
