//! In-memory implementation of the persistence traits.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;

use genesis_chain_core::{Block, BlockHash, PublicKey, RecordId, StatementRecord, TrustedSource};

use crate::error::{Result, StoreError};
use crate::traits::{BlockStore, InsertResult, RecordStore, SourceRegistry};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    records: HashMap<RecordId, StatementRecord>,
    sources: BTreeMap<String, TrustedSource>,
    blocks: HashMap<BlockHash, Block>,
    /// Main chain index, genesis first.
    main_chain: Vec<BlockHash>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn put_record(&self, record: &StatementRecord) -> Result<InsertResult> {
        let mut inner = self.inner.write();
        if inner.records.contains_key(&record.record_id) {
            return Ok(InsertResult::AlreadyExists);
        }
        inner.records.insert(record.record_id, record.clone());
        Ok(InsertResult::Inserted)
    }

    async fn get_record(&self, id: &RecordId) -> Result<Option<StatementRecord>> {
        Ok(self.inner.read().records.get(id).cloned())
    }

    async fn list_records(&self) -> Result<Vec<StatementRecord>> {
        let mut records: Vec<StatementRecord> =
            self.inner.read().records.values().cloned().collect();
        records.sort_by(|a, b| (a.timestamp, a.record_id).cmp(&(b.timestamp, b.record_id)));
        Ok(records)
    }
}

#[async_trait]
impl SourceRegistry for MemoryStore {
    async fn register_source(&self, source: &TrustedSource) -> Result<()> {
        self.inner
            .write()
            .sources
            .insert(source.source_id.clone(), source.clone());
        Ok(())
    }

    async fn resolve(&self, source_id: &str) -> Result<Option<PublicKey>> {
        Ok(self.inner.read().sources.get(source_id).map(|s| s.public_key))
    }

    async fn get_source(&self, source_id: &str) -> Result<Option<TrustedSource>> {
        Ok(self.inner.read().sources.get(source_id).cloned())
    }

    async fn list_sources(&self) -> Result<Vec<TrustedSource>> {
        Ok(self.inner.read().sources.values().cloned().collect())
    }
}

#[async_trait]
impl BlockStore for MemoryStore {
    async fn put_block(&self, block: &Block) -> Result<InsertResult> {
        let mut inner = self.inner.write();
        if inner.blocks.contains_key(&block.hash) {
            return Ok(InsertResult::AlreadyExists);
        }
        inner.blocks.insert(block.hash, block.clone());
        Ok(InsertResult::Inserted)
    }

    async fn get_block(&self, hash: &BlockHash) -> Result<Option<Block>> {
        Ok(self.inner.read().blocks.get(hash).cloned())
    }

    async fn set_main_chain(&self, hashes: &[BlockHash]) -> Result<()> {
        let mut inner = self.inner.write();
        if let Some(missing) = hashes.iter().find(|h| !inner.blocks.contains_key(h)) {
            return Err(StoreError::MissingBlock(missing.to_hex()));
        }
        inner.main_chain = hashes.to_vec();
        Ok(())
    }

    async fn main_chain(&self) -> Result<Vec<Block>> {
        let inner = self.inner.read();
        inner
            .main_chain
            .iter()
            .map(|hash| {
                inner
                    .blocks
                    .get(hash)
                    .cloned()
                    .ok_or_else(|| StoreError::MissingBlock(hash.to_hex()))
            })
            .collect()
    }
}
