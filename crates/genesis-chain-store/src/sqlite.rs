//! SQLite implementation of the persistence traits.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via `tokio::task::spawn_blocking`. Bodies are
//! stored as CBOR; the key columns alongside them exist for lookups.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use genesis_chain_core::{
    now_millis, Block, BlockHash, PublicKey, RecordId, StatementRecord, TrustedSource,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{BlockStore, InsertResult, RecordStore, SourceRegistry};

/// SQLite-based store implementation.
///
/// Thread-safe via an internal mutex. All operations run on the blocking
/// pool so they never stall the async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock();
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::TaskFailed(e.to_string()))?
    }
}

fn encode_body<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode_block(expected: &[u8], body: &[u8]) -> Result<Block> {
    let block: Block = decode_body(body)?;
    if &block.hash.as_bytes()[..] != expected {
        return Err(StoreError::InvalidData(format!(
            "block body hash {} does not match its key",
            block.hash
        )));
    }
    Ok(block)
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn put_record(&self, record: &StatementRecord) -> Result<InsertResult> {
        let record = record.clone();
        let body = encode_body(&record)?;

        self.run(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO records
                    (record_id, source_id, speaker_id, timestamp, body, ingested_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    &record.record_id.as_bytes()[..],
                    record.source_id,
                    record.speaker_id,
                    record.timestamp,
                    body,
                    now_millis(),
                ],
            )?;
            Ok(if changed == 0 {
                InsertResult::AlreadyExists
            } else {
                InsertResult::Inserted
            })
        })
        .await
    }

    async fn get_record(&self, id: &RecordId) -> Result<Option<StatementRecord>> {
        let id = *id;
        self.run(move |conn| {
            let body: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT body FROM records WHERE record_id = ?1",
                    params![&id.as_bytes()[..]],
                    |row| row.get(0),
                )
                .optional()?;
            body.map(|b| decode_body(&b)).transpose()
        })
        .await
    }

    async fn list_records(&self) -> Result<Vec<StatementRecord>> {
        self.run(|conn| {
            let mut stmt = conn.prepare("SELECT body FROM records ORDER BY timestamp, record_id")?;
            let bodies = stmt
                .query_map([], |row| row.get::<_, Vec<u8>>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            bodies.iter().map(|b| decode_body(b)).collect()
        })
        .await
    }
}

#[async_trait]
impl SourceRegistry for SqliteStore {
    async fn register_source(&self, source: &TrustedSource) -> Result<()> {
        let source = source.clone();
        let body = encode_body(&source)?;

        self.run(move |conn| {
            conn.execute(
                "INSERT INTO sources (source_id, public_key, body, registered_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(source_id) DO UPDATE SET
                    public_key = excluded.public_key,
                    body = excluded.body,
                    registered_at = excluded.registered_at",
                params![
                    source.source_id,
                    &source.public_key.0[..],
                    body,
                    now_millis()
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn resolve(&self, source_id: &str) -> Result<Option<PublicKey>> {
        let source_id = source_id.to_string();
        self.run(move |conn| {
            let key: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT public_key FROM sources WHERE source_id = ?1",
                    params![source_id],
                    |row| row.get(0),
                )
                .optional()?;
            key.map(|k| {
                PublicKey::from_slice(&k).map_err(|e| StoreError::InvalidData(e.to_string()))
            })
            .transpose()
        })
        .await
    }

    async fn get_source(&self, source_id: &str) -> Result<Option<TrustedSource>> {
        let source_id = source_id.to_string();
        self.run(move |conn| {
            let body: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT body FROM sources WHERE source_id = ?1",
                    params![source_id],
                    |row| row.get(0),
                )
                .optional()?;
            body.map(|b| decode_body(&b)).transpose()
        })
        .await
    }

    async fn list_sources(&self) -> Result<Vec<TrustedSource>> {
        self.run(|conn| {
            let mut stmt = conn.prepare("SELECT body FROM sources ORDER BY source_id")?;
            let bodies = stmt
                .query_map([], |row| row.get::<_, Vec<u8>>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            bodies.iter().map(|b| decode_body(b)).collect()
        })
        .await
    }
}

#[async_trait]
impl BlockStore for SqliteStore {
    async fn put_block(&self, block: &Block) -> Result<InsertResult> {
        let hash = block.hash;
        let height = block.index as i64;
        let body = encode_body(block)?;

        self.run(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO blocks (block_hash, height, body, ingested_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![&hash.as_bytes()[..], height, body, now_millis()],
            )?;
            Ok(if changed == 0 {
                InsertResult::AlreadyExists
            } else {
                InsertResult::Inserted
            })
        })
        .await
    }

    async fn get_block(&self, hash: &BlockHash) -> Result<Option<Block>> {
        let hash = *hash;
        self.run(move |conn| {
            let body: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT body FROM blocks WHERE block_hash = ?1",
                    params![&hash.as_bytes()[..]],
                    |row| row.get(0),
                )
                .optional()?;
            body.map(|b| decode_block(&hash.as_bytes()[..], &b)).transpose()
        })
        .await
    }

    async fn set_main_chain(&self, hashes: &[BlockHash]) -> Result<()> {
        let hashes = hashes.to_vec();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            for hash in &hashes {
                let exists: Option<i64> = tx
                    .query_row(
                        "SELECT 1 FROM blocks WHERE block_hash = ?1",
                        params![&hash.as_bytes()[..]],
                        |row| row.get(0),
                    )
                    .optional()?;
                if exists.is_none() {
                    return Err(StoreError::MissingBlock(hash.to_hex()));
                }
            }

            tx.execute("DELETE FROM main_chain", [])?;
            {
                let mut insert =
                    tx.prepare("INSERT INTO main_chain (height, block_hash) VALUES (?1, ?2)")?;
                for (height, hash) in hashes.iter().enumerate() {
                    insert.execute(params![height as i64, &hash.as_bytes()[..]])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn main_chain(&self) -> Result<Vec<Block>> {
        self.run(|conn| {
            let mut stmt = conn.prepare(
                "SELECT b.block_hash, b.body FROM main_chain m
                 JOIN blocks b ON b.block_hash = m.block_hash
                 ORDER BY m.height",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.iter()
                .map(|(hash, body)| decode_block(hash, body))
                .collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genesis_chain_core::{
        derive_record_id, statement_hash, transactions_root, BlockHeader, KeyPair,
        SignatureEngine, StatementMetadata, Transaction, TransactionBuilder,
    };

    fn make_record(statement: &str, timestamp: i64) -> StatementRecord {
        let engine = SignatureEngine::new();
        let source = KeyPair::from_seed(&[4; 32]);
        let hash = statement_hash(statement, "speaker", timestamp);
        let signature = engine
            .sign(hash.as_bytes(), source.private_key().as_bytes())
            .unwrap();
        StatementRecord {
            record_id: derive_record_id(&hash, &signature),
            statement: statement.into(),
            speaker_id: "speaker".into(),
            source_id: "wire".into(),
            timestamp,
            metadata: StatementMetadata {
                speaker_name: "A. Speaker".into(),
                context_category: "economy".into(),
                context_tags: vec!["budget".into()],
                ..StatementMetadata::default()
            },
            statement_hash: hash,
            signature,
        }
    }

    fn make_block(parent: &Block) -> Block {
        let engine = SignatureEngine::new();
        let alice = KeyPair::from_seed(&[1; 32]);
        let miner = KeyPair::from_seed(&[5; 32]);
        let transfer = TransactionBuilder::new(alice.public_key(), miner.public_key(), 7)
            .fee(1)
            .sign(&engine, &alice)
            .unwrap();
        let txs = vec![
            transfer,
            Transaction::reward(miner.public_key(), 51, parent.index + 1, 0),
        ];
        let header = BlockHeader {
            index: parent.index + 1,
            previous_hash: parent.hash,
            merkle_root: transactions_root(&txs),
            timestamp: parent.timestamp + 1,
            nonce: 0,
            difficulty: 0,
        };
        Block::from_header(header, txs)
    }

    #[tokio::test]
    async fn test_insert_and_get_record() {
        let store = SqliteStore::open_memory().unwrap();
        let record = make_record("we will cut taxes", 1_000);

        let result = store.put_record(&record).await.unwrap();
        assert_eq!(result, InsertResult::Inserted);

        let retrieved = store.get_record(&record.record_id).await.unwrap().unwrap();
        assert_eq!(retrieved, record);
        assert_eq!(retrieved.signature, record.signature);
    }

    #[tokio::test]
    async fn test_idempotent_insert() {
        let store = SqliteStore::open_memory().unwrap();
        let record = make_record("s", 1);

        assert_eq!(store.put_record(&record).await.unwrap(), InsertResult::Inserted);
        assert_eq!(
            store.put_record(&record).await.unwrap(),
            InsertResult::AlreadyExists
        );
        assert_eq!(store.list_records().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_records_ordered_by_timestamp() {
        let store = SqliteStore::open_memory().unwrap();
        let c = make_record("c", 30);
        let a = make_record("a", 10);
        let b = make_record("b", 20);
        for r in [&c, &a, &b] {
            store.put_record(r).await.unwrap();
        }
        let statements: Vec<String> = store
            .list_records()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.statement)
            .collect();
        assert_eq!(statements, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_source_upsert_and_resolve() {
        let store = SqliteStore::open_memory().unwrap();
        let first = KeyPair::from_seed(&[6; 32]).public_key();
        let rotated = KeyPair::from_seed(&[7; 32]).public_key();
        let mut source = TrustedSource {
            source_id: "wire".into(),
            name: "Wire Service".into(),
            source_type: "news".into(),
            url: "https://wire.example".into(),
            public_key: first,
        };

        store.register_source(&source).await.unwrap();
        assert_eq!(store.resolve("wire").await.unwrap(), Some(first));

        source.public_key = rotated;
        store.register_source(&source).await.unwrap();
        assert_eq!(store.resolve("wire").await.unwrap(), Some(rotated));
        assert_eq!(store.get_source("wire").await.unwrap(), Some(source));
        assert_eq!(store.resolve("missing").await.unwrap(), None);
        assert_eq!(store.list_sources().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_blocks_and_main_chain() {
        let store = SqliteStore::open_memory().unwrap();
        let genesis = Block::genesis();
        let b1 = make_block(&genesis);
        let b2 = make_block(&b1);

        for block in [&genesis, &b1, &b2] {
            assert_eq!(store.put_block(block).await.unwrap(), InsertResult::Inserted);
        }
        assert_eq!(
            store.put_block(&b1).await.unwrap(),
            InsertResult::AlreadyExists
        );
        assert_eq!(store.get_block(&b2.hash).await.unwrap(), Some(b2.clone()));

        store
            .set_main_chain(&[genesis.hash, b1.hash, b2.hash])
            .await
            .unwrap();
        assert_eq!(
            store.main_chain().await.unwrap(),
            vec![genesis.clone(), b1.clone(), b2.clone()]
        );

        // Shrinking the index keeps the bodies.
        store.set_main_chain(&[genesis.hash, b1.hash]).await.unwrap();
        assert_eq!(store.main_chain().await.unwrap().len(), 2);
        assert!(store.get_block(&b2.hash).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_main_chain_rejects_unknown_block() {
        let store = SqliteStore::open_memory().unwrap();
        let genesis = Block::genesis();
        store.put_block(&genesis).await.unwrap();
        store.set_main_chain(&[genesis.hash]).await.unwrap();

        let orphan = make_block(&genesis);
        let err = store
            .set_main_chain(&[genesis.hash, orphan.hash])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingBlock(_)));
        // The failed update rolled back.
        assert_eq!(store.main_chain().await.unwrap(), vec![genesis]);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genesis.db");
        let record = make_record("on the record", 5);
        let genesis = Block::genesis();

        {
            let store = SqliteStore::open(&path).unwrap();
            store.put_record(&record).await.unwrap();
            store.put_block(&genesis).await.unwrap();
            store.set_main_chain(&[genesis.hash]).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get_record(&record.record_id).await.unwrap(), Some(record));
        assert_eq!(store.main_chain().await.unwrap(), vec![genesis]);
    }
}
