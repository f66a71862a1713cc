//! Database schema migrations for SQLite.
//!
//! A simple versioned migration system. Each migration transforms the schema
//! from version N to N+1.

use genesis_chain_core::now_millis;
use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema. Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::debug!(from = current, to = CURRENT_VERSION, "migrated schema");
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Statement records, content-addressed
        CREATE TABLE records (
            record_id BLOB PRIMARY KEY,       -- 32 bytes
            source_id TEXT NOT NULL,
            speaker_id TEXT NOT NULL,
            timestamp INTEGER NOT NULL,       -- statement time (Unix ms)
            body BLOB NOT NULL,               -- CBOR StatementRecord
            ingested_at INTEGER NOT NULL
        );

        -- Trusted sources
        CREATE TABLE sources (
            source_id TEXT PRIMARY KEY,
            public_key BLOB NOT NULL,         -- 32 bytes, Ed25519 public key
            body BLOB NOT NULL,               -- CBOR TrustedSource
            registered_at INTEGER NOT NULL
        );

        -- Every block ever stored, main chain or not
        CREATE TABLE blocks (
            block_hash BLOB PRIMARY KEY,      -- 32 bytes
            height INTEGER NOT NULL,
            body BLOB NOT NULL,               -- CBOR Block
            ingested_at INTEGER NOT NULL
        );

        -- Current main chain, one row per height
        CREATE TABLE main_chain (
            height INTEGER PRIMARY KEY,
            block_hash BLOB NOT NULL REFERENCES blocks(block_hash)
        );

        CREATE INDEX idx_records_timestamp ON records(timestamp, record_id);
        CREATE INDEX idx_records_speaker ON records(speaker_id);
        CREATE INDEX idx_blocks_height ON blocks(height);
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in ["records", "sources", "blocks", "main_chain", "schema_migrations"] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }
}
