//! # GenesisChain Accountability Ledger
//!
//! Anchors recorded statements to the identity of the source that signed
//! them. A record can be re-verified at any time from its id: the ledger
//! reloads it, looks up the source's registered key, recomputes the
//! statement hash and checks the signature.
//!
//! The ledger runs independently of the chain.

pub mod error;
pub mod ledger;
pub mod query;

pub use error::{LedgerError, Result};
pub use ledger::{AccountabilityLedger, NewStatement, RecordVerification, Rejection};
pub use query::StatementQuery;
