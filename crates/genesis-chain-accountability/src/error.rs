//! Ledger errors.
//!
//! Verification failures are not errors; they come back as a
//! [`crate::RecordVerification`] with a reason.

use genesis_chain_core::CoreError;
use genesis_chain_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("signing failed: {0}")]
    Signing(#[from] CoreError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
