//! Persistence traits: the abstract interfaces the node and ledger store
//! through.
//!
//! Implementations include SQLite (primary) and in-memory (for tests).

use std::sync::Arc;

use async_trait::async_trait;
use genesis_chain_core::{Block, BlockHash, PublicKey, RecordId, StatementRecord, TrustedSource};

use crate::error::Result;

/// Result of inserting a content-addressed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Item was inserted.
    Inserted,
    /// An item with the same id already exists (idempotent, not an error).
    AlreadyExists,
}

/// Append-only storage for statement records.
///
/// Records are content-addressed by `record_id`, so inserting the same id
/// twice returns `AlreadyExists` and leaves the first copy untouched.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn put_record(&self, record: &StatementRecord) -> Result<InsertResult>;

    async fn get_record(&self, id: &RecordId) -> Result<Option<StatementRecord>>;

    /// All records, ordered by statement timestamp then record id.
    async fn list_records(&self) -> Result<Vec<StatementRecord>>;
}

/// Lookup of trusted sources by id.
#[async_trait]
pub trait SourceRegistry: Send + Sync {
    /// Register or replace a source.
    async fn register_source(&self, source: &TrustedSource) -> Result<()>;

    /// Public key for `source_id`, if registered.
    async fn resolve(&self, source_id: &str) -> Result<Option<PublicKey>>;

    async fn get_source(&self, source_id: &str) -> Result<Option<TrustedSource>>;

    /// All sources, ordered by id.
    async fn list_sources(&self) -> Result<Vec<TrustedSource>>;
}

/// Block bodies plus the index of the current main chain.
///
/// Blocks are kept even after they leave the main chain.
#[async_trait]
pub trait BlockStore: Send + Sync {
    async fn put_block(&self, block: &Block) -> Result<InsertResult>;

    async fn get_block(&self, hash: &BlockHash) -> Result<Option<Block>>;

    /// Replace the main chain index with `hashes`, genesis first.
    ///
    /// Every hash must already be stored.
    async fn set_main_chain(&self, hashes: &[BlockHash]) -> Result<()>;

    /// Blocks of the main chain, genesis first. Empty if never set.
    async fn main_chain(&self) -> Result<Vec<Block>>;
}

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    async fn put_record(&self, record: &StatementRecord) -> Result<InsertResult> {
        (**self).put_record(record).await
    }

    async fn get_record(&self, id: &RecordId) -> Result<Option<StatementRecord>> {
        (**self).get_record(id).await
    }

    async fn list_records(&self) -> Result<Vec<StatementRecord>> {
        (**self).list_records().await
    }
}

#[async_trait]
impl<T: SourceRegistry + ?Sized> SourceRegistry for Arc<T> {
    async fn register_source(&self, source: &TrustedSource) -> Result<()> {
        (**self).register_source(source).await
    }

    async fn resolve(&self, source_id: &str) -> Result<Option<PublicKey>> {
        (**self).resolve(source_id).await
    }

    async fn get_source(&self, source_id: &str) -> Result<Option<TrustedSource>> {
        (**self).get_source(source_id).await
    }

    async fn list_sources(&self) -> Result<Vec<TrustedSource>> {
        (**self).list_sources().await
    }
}

#[async_trait]
impl<T: BlockStore + ?Sized> BlockStore for Arc<T> {
    async fn put_block(&self, block: &Block) -> Result<InsertResult> {
        (**self).put_block(block).await
    }

    async fn get_block(&self, hash: &BlockHash) -> Result<Option<Block>> {
        (**self).get_block(hash).await
    }

    async fn set_main_chain(&self, hashes: &[BlockHash]) -> Result<()> {
        (**self).set_main_chain(hashes).await
    }

    async fn main_chain(&self) -> Result<Vec<Block>> {
        (**self).main_chain().await
    }
}
