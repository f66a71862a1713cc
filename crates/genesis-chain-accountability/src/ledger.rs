//! The accountability ledger: statements signed by trusted sources,
//! re-verifiable from their record id alone.

use std::fmt;
use std::sync::Arc;

use genesis_chain_core::{
    derive_record_id, now_millis, statement_hash, PrivateKey, RecordId, SignatureEngine, Signer,
    StatementMetadata, StatementRecord, TrustedSource, Verifier,
};
use genesis_chain_store::{InsertResult, RecordStore, SourceRegistry};
use tracing::{debug, info, warn};

use crate::error::{LedgerError, Result};
use crate::query::StatementQuery;

/// Why a record failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    RecordNotFound,
    SourceNotFound,
    StatementHashMismatch,
    SignatureInvalid,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::RecordNotFound => "record not found",
            Rejection::SourceNotFound => "source not found",
            Rejection::StatementHashMismatch => "statement hash mismatch",
            Rejection::SignatureInvalid => "signature invalid",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`AccountabilityLedger::verify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordVerification {
    pub is_verified: bool,
    pub reason: Option<Rejection>,
}

impl RecordVerification {
    fn verified() -> Self {
        Self {
            is_verified: true,
            reason: None,
        }
    }

    fn rejected(reason: Rejection) -> Self {
        Self {
            is_verified: false,
            reason: Some(reason),
        }
    }

    pub fn reason_str(&self) -> Option<&'static str> {
        self.reason.map(|r| r.as_str())
    }
}

/// A statement about to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStatement {
    pub statement: String,
    pub speaker_id: String,
    pub source_id: String,
    /// Defaults to the current time.
    pub timestamp: i64,
    pub metadata: StatementMetadata,
}

impl NewStatement {
    pub fn new(
        statement: impl Into<String>,
        speaker_id: impl Into<String>,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            statement: statement.into(),
            speaker_id: speaker_id.into(),
            source_id: source_id.into(),
            timestamp: now_millis(),
            metadata: StatementMetadata::default(),
        }
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn metadata(mut self, metadata: StatementMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Records and re-verifies signed statements.
///
/// Persistence and source lookup are injected. Signing and verification go
/// through `C`, which is the plain signature engine unless a cache is
/// supplied with [`AccountabilityLedger::with_crypto`].
pub struct AccountabilityLedger<S, R, C = SignatureEngine> {
    records: S,
    sources: R,
    crypto: Arc<C>,
}

impl<S: RecordStore, R: SourceRegistry> AccountabilityLedger<S, R> {
    pub fn new(records: S, sources: R) -> Self {
        Self::with_crypto(records, sources, Arc::new(SignatureEngine::new()))
    }
}

impl<S, R, C> AccountabilityLedger<S, R, C>
where
    S: RecordStore,
    R: SourceRegistry,
    C: Signer + Verifier,
{
    pub fn with_crypto(records: S, sources: R, crypto: Arc<C>) -> Self {
        Self {
            records,
            sources,
            crypto,
        }
    }

    pub fn records(&self) -> &S {
        &self.records
    }

    pub fn sources(&self) -> &R {
        &self.sources
    }

    /// Register (or replace) a trusted source.
    pub async fn register_source(&self, source: &TrustedSource) -> Result<()> {
        if source.source_id.is_empty() {
            return Err(LedgerError::InvalidInput("source_id must not be empty".into()));
        }
        self.sources.register_source(source).await?;
        info!(source_id = %source.source_id, "registered trusted source");
        Ok(())
    }

    /// Sign and persist a statement made now, returning its record id.
    pub async fn record(
        &self,
        statement: &str,
        speaker_id: &str,
        source_id: &str,
        source_private_key: &PrivateKey,
    ) -> Result<RecordId> {
        let record = self
            .record_statement(
                NewStatement::new(statement, speaker_id, source_id),
                source_private_key,
            )
            .await?;
        Ok(record.record_id)
    }

    /// Sign and persist a statement with explicit timestamp and metadata.
    ///
    /// The source does not need to be registered yet; an unregistered
    /// source only fails later, at verification.
    pub async fn record_statement(
        &self,
        draft: NewStatement,
        source_private_key: &PrivateKey,
    ) -> Result<StatementRecord> {
        if draft.speaker_id.is_empty() {
            return Err(LedgerError::InvalidInput("speaker_id must not be empty".into()));
        }
        if draft.source_id.is_empty() {
            return Err(LedgerError::InvalidInput("source_id must not be empty".into()));
        }

        let hash = statement_hash(&draft.statement, &draft.speaker_id, draft.timestamp);
        let signature = self
            .crypto
            .sign(hash.as_bytes(), source_private_key.as_bytes())?;

        let record = StatementRecord {
            record_id: derive_record_id(&hash, &signature),
            statement: draft.statement,
            speaker_id: draft.speaker_id,
            source_id: draft.source_id,
            timestamp: draft.timestamp,
            metadata: draft.metadata,
            statement_hash: hash,
            signature,
        };

        if self.records.put_record(&record).await? == InsertResult::AlreadyExists {
            debug!(record_id = %record.record_id, "record already present");
        }
        info!(
            record_id = %record.record_id,
            speaker_id = %record.speaker_id,
            source_id = %record.source_id,
            "recorded statement"
        );
        Ok(record)
    }

    pub async fn get_record(&self, record_id: &RecordId) -> Result<Option<StatementRecord>> {
        Ok(self.records.get_record(record_id).await?)
    }

    /// Re-verify a stored record against its source's registered key.
    ///
    /// Checks, in order: the record exists, the source is registered, the
    /// statement hash matches the stored fields, the signature verifies.
    /// Only storage failures are errors.
    pub async fn verify(&self, record_id: &RecordId) -> Result<RecordVerification> {
        let outcome = self.check(record_id).await?;
        match outcome.reason {
            None => debug!(record_id = %record_id, "record verified"),
            Some(reason) => warn!(record_id = %record_id, %reason, "record failed verification"),
        }
        Ok(outcome)
    }

    async fn check(&self, record_id: &RecordId) -> Result<RecordVerification> {
        let Some(record) = self.records.get_record(record_id).await? else {
            return Ok(RecordVerification::rejected(Rejection::RecordNotFound));
        };

        let Some(public_key) = self.sources.resolve(&record.source_id).await? else {
            return Ok(RecordVerification::rejected(Rejection::SourceNotFound));
        };

        let recomputed = record.compute_statement_hash();
        if recomputed != record.statement_hash {
            return Ok(RecordVerification::rejected(
                Rejection::StatementHashMismatch,
            ));
        }

        if !self.crypto.verify(
            recomputed.as_bytes(),
            record.signature.as_bytes(),
            public_key.as_bytes(),
        ) {
            return Ok(RecordVerification::rejected(Rejection::SignatureInvalid));
        }

        Ok(RecordVerification::verified())
    }

    /// Records matching `query`, ordered by timestamp.
    pub async fn query(&self, query: &StatementQuery) -> Result<Vec<StatementRecord>> {
        let mut records = self.records.list_records().await?;
        records.retain(|r| query.matches(r));
        Ok(records)
    }

    pub async fn statements_by_speaker(&self, speaker_id: &str) -> Result<Vec<StatementRecord>> {
        self.query(&StatementQuery::new().speaker(speaker_id)).await
    }

    pub async fn statements_by_category(&self, category: &str) -> Result<Vec<StatementRecord>> {
        self.query(&StatementQuery::new().category(category)).await
    }

    pub async fn statements_by_tag(&self, tag: &str) -> Result<Vec<StatementRecord>> {
        self.query(&StatementQuery::new().tag(tag)).await
    }

    /// Statements with `from <= timestamp <= to`.
    pub async fn statements_between(&self, from: i64, to: i64) -> Result<Vec<StatementRecord>> {
        self.query(&StatementQuery::new().between(from, to)).await
    }

    /// Case-insensitive substring search over statement text.
    pub async fn search(&self, text: &str) -> Result<Vec<StatementRecord>> {
        self.query(&StatementQuery::new().text(text)).await
    }
}
