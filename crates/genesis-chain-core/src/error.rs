//! Error types for GenesisChain core primitives.

use thiserror::Error;

/// Errors raised at the boundary of core operations.
///
/// Cryptographic mismatches are never reported through this type:
/// verification returns `bool` and validation returns its own reason enums.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed sizes or values. Rejected immediately, never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The entropy source could not produce random bytes. Fatal.
    #[error("entropy source failure: {0}")]
    EntropySourceFailure(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}
