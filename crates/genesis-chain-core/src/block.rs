//! Blocks and their proof-of-work header.

use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::merkle::merkle_root;
use crate::transaction::Transaction;
use crate::types::BlockHash;

/// Encoded header length: index(8) + previous(32) + merkle(32) + timestamp(8)
/// + nonce(8) + difficulty(4).
pub const HEADER_LEN: usize = 92;

/// Offset of the nonce within the encoded header.
pub const NONCE_OFFSET: usize = 80;

/// Fixed genesis timestamp (2025-01-01T00:00:00Z, Unix milliseconds).
pub const GENESIS_TIMESTAMP: i64 = 1_735_689_600_000;

/// The fields a block hash commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub index: u64,
    pub previous_hash: BlockHash,
    pub merkle_root: Digest,
    pub timestamp: i64,
    pub nonce: u64,
    pub difficulty: u32,
}

impl BlockHeader {
    /// Big-endian header bytes in hash order.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..8].copy_from_slice(&self.index.to_be_bytes());
        buf[8..40].copy_from_slice(self.previous_hash.as_bytes());
        buf[40..72].copy_from_slice(self.merkle_root.as_bytes());
        buf[72..80].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[NONCE_OFFSET..88].copy_from_slice(&self.nonce.to_be_bytes());
        buf[88..92].copy_from_slice(&self.difficulty.to_be_bytes());
        buf
    }

    /// `H(index || previous_hash || merkle_root || timestamp || nonce || difficulty)`.
    pub fn compute_hash(&self) -> BlockHash {
        BlockHash::from(Digest::hash(&self.encode()))
    }

    /// Hasher primed with every field that precedes the nonce.
    ///
    /// Nonce search clones it per attempt instead of re-hashing the prefix.
    pub fn prefix_hasher(&self) -> blake3::Hasher {
        let encoded = self.encode();
        let mut hasher = blake3::Hasher::new();
        hasher.update(&encoded[..NONCE_OFFSET]);
        hasher
    }

    /// Hash with a different nonce, starting from a primed prefix hasher.
    pub fn hash_with_nonce(&self, prefix: &blake3::Hasher, nonce: u64) -> BlockHash {
        let mut hasher = prefix.clone();
        hasher.update(&nonce.to_be_bytes());
        hasher.update(&self.difficulty.to_be_bytes());
        BlockHash::from_bytes(*hasher.finalize().as_bytes())
    }
}

/// A block. Immutable once appended to a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Unix milliseconds.
    pub timestamp: i64,
    pub previous_hash: BlockHash,
    pub merkle_root: Digest,
    pub nonce: u64,
    /// Required leading zero bits of `hash`.
    pub difficulty: u32,
    pub transactions: Vec<Transaction>,
    pub hash: BlockHash,
}

impl Block {
    /// The fixed genesis block shared by every node.
    pub fn genesis() -> Self {
        let merkle_root = merkle_root(&[]);
        let header = BlockHeader {
            index: 0,
            previous_hash: BlockHash::ZERO,
            merkle_root,
            timestamp: GENESIS_TIMESTAMP,
            nonce: 0,
            difficulty: 0,
        };
        Self::from_header(header, Vec::new())
    }

    /// Assemble a block from a header, stamping the computed hash.
    pub fn from_header(header: BlockHeader, transactions: Vec<Transaction>) -> Self {
        Self {
            index: header.index,
            timestamp: header.timestamp,
            previous_hash: header.previous_hash,
            merkle_root: header.merkle_root,
            nonce: header.nonce,
            difficulty: header.difficulty,
            transactions,
            hash: header.compute_hash(),
        }
    }

    pub fn header(&self) -> BlockHeader {
        BlockHeader {
            index: self.index,
            previous_hash: self.previous_hash,
            merkle_root: self.merkle_root,
            timestamp: self.timestamp,
            nonce: self.nonce,
            difficulty: self.difficulty,
        }
    }

    /// Recompute the hash from the header fields.
    pub fn compute_hash(&self) -> BlockHash {
        self.header().compute_hash()
    }

    /// Recompute the Merkle root from the transactions.
    pub fn compute_merkle_root(&self) -> Digest {
        transactions_root(&self.transactions)
    }

    /// Whether the stored hash meets the stored difficulty.
    pub fn meets_difficulty(&self) -> bool {
        self.hash.leading_zero_bits() >= self.difficulty
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.previous_hash == BlockHash::ZERO
    }

    /// Sum of fees over transfer transactions, `None` on overflow.
    pub fn total_fees(&self) -> Option<u64> {
        self.transactions
            .iter()
            .filter(|tx| !tx.is_reward())
            .try_fold(0u64, |acc, tx| acc.checked_add(tx.fee))
    }
}

/// Merkle root over transaction leaf hashes.
pub fn transactions_root(transactions: &[Transaction]) -> Digest {
    let leaves: Vec<Digest> = transactions.iter().map(Transaction::leaf_hash).collect();
    merkle_root(&leaves)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_is_deterministic() {
        let a = Block::genesis();
        let b = Block::genesis();
        assert_eq!(a, b);
        assert!(a.is_genesis());
        assert!(a.meets_difficulty());
        assert_eq!(a.hash, a.compute_hash());
    }

    #[test]
    fn test_header_layout() {
        let header = BlockHeader {
            index: 1,
            previous_hash: BlockHash::from_bytes([0xaa; 32]),
            merkle_root: Digest::from_bytes([0xbb; 32]),
            timestamp: 2,
            nonce: 3,
            difficulty: 4,
        };
        let bytes = header.encode();
        assert_eq!(&bytes[0..8], &1u64.to_be_bytes());
        assert_eq!(&bytes[8..40], &[0xaa; 32]);
        assert_eq!(&bytes[40..72], &[0xbb; 32]);
        assert_eq!(&bytes[72..80], &2i64.to_be_bytes());
        assert_eq!(&bytes[80..88], &3u64.to_be_bytes());
        assert_eq!(&bytes[88..92], &4u32.to_be_bytes());
    }

    #[test]
    fn test_prefix_hasher_matches_full_hash() {
        let mut header = Block::genesis().header();
        header.difficulty = 9;
        let prefix = header.prefix_hasher();
        for nonce in [0u64, 1, 42, u64::MAX] {
            header.nonce = nonce;
            assert_eq!(header.hash_with_nonce(&prefix, nonce), header.compute_hash());
        }
    }

    #[test]
    fn test_every_header_field_changes_hash() {
        let base = Block::genesis().header();
        let h = base.compute_hash();

        let mut m = base;
        m.index += 1;
        assert_ne!(m.compute_hash(), h);

        let mut m = base;
        m.timestamp += 1;
        assert_ne!(m.compute_hash(), h);

        let mut m = base;
        m.nonce += 1;
        assert_ne!(m.compute_hash(), h);

        let mut m = base;
        m.difficulty += 1;
        assert_ne!(m.compute_hash(), h);

        let mut m = base;
        m.merkle_root = Digest::ZERO;
        assert_ne!(m.compute_hash(), h);
    }
}
