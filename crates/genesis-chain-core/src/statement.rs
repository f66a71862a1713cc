//! Statement records and the trusted sources that sign them.

use serde::{Deserialize, Serialize};

use crate::canonical::statement_bytes;
use crate::digest::Digest;
use crate::signature::{PublicKey, Signature};
use crate::types::RecordId;

const RECORD_ID_DOMAIN: &str = "genesis-chain-record-id";

/// Descriptive context attached to a statement. Not covered by the hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementMetadata {
    pub speaker_name: String,
    pub speaker_title: String,
    pub source_url: String,
    pub context_category: String,
    #[serde(default)]
    pub context_tags: Vec<String>,
}

impl StatementMetadata {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.context_tags.iter().any(|t| t == tag)
    }
}

/// A signed statement. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementRecord {
    pub record_id: RecordId,
    pub statement: String,
    pub speaker_id: String,
    pub source_id: String,
    /// When the statement was made (Unix milliseconds).
    pub timestamp: i64,
    pub metadata: StatementMetadata,
    pub statement_hash: Digest,
    /// Source signature over the 32 `statement_hash` bytes.
    pub signature: Signature,
}

impl StatementRecord {
    /// Recompute the hash from the stored statement fields.
    pub fn compute_statement_hash(&self) -> Digest {
        statement_hash(&self.statement, &self.speaker_id, self.timestamp)
    }
}

/// `H(canonical(statement, speaker_id, timestamp))`.
pub fn statement_hash(statement: &str, speaker_id: &str, timestamp: i64) -> Digest {
    Digest::hash(&statement_bytes(statement, speaker_id, timestamp))
}

/// Content address of a record: domain digest over hash and signature.
pub fn derive_record_id(statement_hash: &Digest, signature: &Signature) -> RecordId {
    RecordId::from(Digest::hash_domain(
        RECORD_ID_DOMAIN,
        &[statement_hash.as_bytes(), signature.as_bytes()],
    ))
}

/// A source whose public key vouches for recorded statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedSource {
    pub source_id: String,
    pub name: String,
    /// Free-form class such as "news" or "government".
    pub source_type: String,
    pub url: String,
    pub public_key: PublicKey,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{KeyPair, SignatureEngine};

    #[test]
    fn test_statement_hash_ignores_metadata() {
        let engine = SignatureEngine::new();
        let source = KeyPair::from_seed(&[9; 32]);
        let hash = statement_hash("we will build it", "speaker-1", 1_000);
        let signature = engine.sign(hash.as_bytes(), source.private_key().as_bytes()).unwrap();

        let mut record = StatementRecord {
            record_id: derive_record_id(&hash, &signature),
            statement: "we will build it".into(),
            speaker_id: "speaker-1".into(),
            source_id: "wire".into(),
            timestamp: 1_000,
            metadata: StatementMetadata::default(),
            statement_hash: hash,
            signature,
        };
        assert_eq!(record.compute_statement_hash(), hash);

        record.metadata.context_tags.push("economy".into());
        assert_eq!(record.compute_statement_hash(), hash);
        assert!(record.metadata.has_tag("economy"));

        record.statement.push('!');
        assert_ne!(record.compute_statement_hash(), hash);
    }

    #[test]
    fn test_record_id_depends_on_signature() {
        let engine = SignatureEngine::new();
        let source = KeyPair::from_seed(&[9; 32]);
        let hash = statement_hash("s", "p", 0);
        let a = engine.sign(hash.as_bytes(), source.private_key().as_bytes()).unwrap();
        let b = engine.sign(hash.as_bytes(), source.private_key().as_bytes()).unwrap();
        assert_ne!(derive_record_id(&hash, &a), derive_record_id(&hash, &b));
        assert_eq!(derive_record_id(&hash, &a), derive_record_id(&hash, &a));
    }
}
