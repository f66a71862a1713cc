//! Strong identifier types.
//!
//! All identifiers are 32-byte newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::digest::Digest;

macro_rules! digest_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// Create from raw bytes.
            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Get the raw bytes.
            pub const fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Convert to hex string.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Parse from hex string.
            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                Digest::from_hex(s).map(|d| Self(d.0))
            }

            /// The zero identifier (sentinel).
            pub const ZERO: Self = Self([0u8; 32]);
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), &self.to_hex()[..16])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", &self.to_hex()[..16])
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl From<Digest> for $name {
            fn from(digest: Digest) -> Self {
                Self(digest.0)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = std::array::TryFromSliceError;

            fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
                let arr: [u8; 32] = slice.try_into()?;
                Ok(Self(arr))
            }
        }
    };
}

digest_id!(
    /// Transaction identifier: `H(signing bytes)`.
    TxId
);

digest_id!(
    /// Block hash: `H(index || previous_hash || merkle_root || timestamp || nonce || difficulty)`.
    ///
    /// `BlockHash::ZERO` is the genesis `previous_hash` sentinel.
    BlockHash
);

digest_id!(
    /// Statement record identifier, content-addressed over the statement
    /// hash and its signature.
    RecordId
);

impl BlockHash {
    /// Number of leading zero bits (proof-of-work measure).
    pub fn leading_zero_bits(&self) -> u32 {
        crate::digest::leading_zero_bits(&self.0)
    }
}

/// Current wall-clock time in Unix milliseconds, the unit of every timestamp
/// in GenesisChain. A clock set before 1970 reads as 0.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_after_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }

    #[test]
    fn test_block_hash_hex_roundtrip() {
        let hash = BlockHash::from_bytes([0x42; 32]);
        let recovered = BlockHash::from_hex(&hash.to_hex()).unwrap();
        assert_eq!(hash, recovered);
    }

    #[test]
    fn test_tx_id_display() {
        let id = TxId::from_bytes([0xab; 32]);
        assert_eq!(format!("{}", id), "abababababababab");
    }

    #[test]
    fn test_record_id_debug() {
        let id = RecordId::from_bytes([0xcd; 32]);
        assert!(format!("{:?}", id).starts_with("RecordId("));
    }

    #[test]
    fn test_try_from_slice_rejects_wrong_length() {
        assert!(TxId::try_from(&[0u8; 31][..]).is_err());
        assert!(TxId::try_from(&[0u8; 32][..]).is_ok());
    }
}
