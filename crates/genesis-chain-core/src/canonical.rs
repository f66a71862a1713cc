//! Canonical CBOR encoding for deterministic hashing and signing.
//!
//! Follows RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats (amounts are integer base units, timestamps are i64 milliseconds)
//!
//! Transaction ids, Merkle leaves and statement hashes are all computed over
//! these bytes, so every node must produce them identically.

use ciborium::value::Value;

use crate::error::CoreError;
use crate::transaction::Transaction;

/// Transaction field keys. Keys 0-23 encode as single bytes.
mod tx_keys {
    pub const KIND: u64 = 0;
    pub const SENDER: u64 = 1;
    pub const RECIPIENT: u64 = 2;
    pub const AMOUNT: u64 = 3;
    pub const FEE: u64 = 4;
    pub const TIMESTAMP: u64 = 5;
    pub const NONCE: u64 = 6;
}

/// Statement field keys.
mod statement_keys {
    pub const STATEMENT: u64 = 0;
    pub const SPEAKER_ID: u64 = 1;
    pub const TIMESTAMP: u64 = 2;
}

/// Encode every transaction field except `id` and `signature`.
///
/// These are the bytes a sender signs.
pub fn transaction_signing_bytes(tx: &Transaction) -> Vec<u8> {
    let item = Item::Map(vec![
        (key(tx_keys::KIND), Item::Int(tx.kind.to_u8().into())),
        (key(tx_keys::SENDER), Item::Bytes(&tx.sender.0)),
        (key(tx_keys::RECIPIENT), Item::Bytes(&tx.recipient.0)),
        (key(tx_keys::AMOUNT), Item::Int(tx.amount.into())),
        (key(tx_keys::FEE), Item::Int(tx.fee.into())),
        (key(tx_keys::TIMESTAMP), Item::Int(tx.timestamp.into())),
        (key(tx_keys::NONCE), Item::Int(tx.nonce.into())),
    ]);
    encode_item(&item)
}

/// Encode the fields a statement hash commits to.
pub fn statement_bytes(statement: &str, speaker_id: &str, timestamp: i64) -> Vec<u8> {
    let item = Item::Map(vec![
        (key(statement_keys::STATEMENT), Item::Text(statement)),
        (key(statement_keys::SPEAKER_ID), Item::Text(speaker_id)),
        (key(statement_keys::TIMESTAMP), Item::Int(timestamp.into())),
    ]);
    encode_item(&item)
}

/// The CBOR subset that has a canonical form here.
enum Item<'a> {
    Int(i128),
    Bytes(&'a [u8]),
    Text(&'a str),
    Array(Vec<Item<'a>>),
    Map(Vec<(Item<'a>, Item<'a>)>),
    Bool(bool),
    Null,
}

impl<'a> Item<'a> {
    fn from_value(value: &'a Value) -> Result<Self, CoreError> {
        Ok(match value {
            Value::Integer(i) => Item::Int((*i).into()),
            Value::Bytes(b) => Item::Bytes(b),
            Value::Text(s) => Item::Text(s),
            Value::Array(arr) => Item::Array(
                arr.iter()
                    .map(Item::from_value)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Map(entries) => Item::Map(
                entries
                    .iter()
                    .map(|(k, v)| Ok((Item::from_value(k)?, Item::from_value(v)?)))
                    .collect::<Result<_, CoreError>>()?,
            ),
            Value::Bool(b) => Item::Bool(*b),
            Value::Null => Item::Null,
            Value::Float(_) => {
                return Err(CoreError::EncodingError(
                    "floats have no canonical encoding".into(),
                ))
            }
            _ => {
                return Err(CoreError::EncodingError(
                    "unsupported CBOR value type".into(),
                ))
            }
        })
    }
}

fn key(k: u64) -> Item<'static> {
    Item::Int(k.into())
}

/// Encode a CBOR value to canonical bytes.
///
/// Floats, tags and other values outside the deterministic subset are
/// rejected with `EncodingError`.
pub fn encode_canonical(value: &Value) -> Result<Vec<u8>, CoreError> {
    Ok(encode_item(&Item::from_value(value)?))
}

fn encode_item(item: &Item<'_>) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_item_to(&mut buf, item);
    buf
}

fn encode_item_to(buf: &mut Vec<u8>, item: &Item<'_>) {
    match item {
        Item::Int(n) => encode_integer(buf, *n),
        Item::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Item::Text(s) => {
            encode_uint(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Item::Array(arr) => {
            encode_uint(buf, 4, arr.len() as u64);
            for item in arr {
                encode_item_to(buf, item);
            }
        }
        Item::Map(entries) => encode_map_canonical(buf, entries),
        Item::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Item::Null => buf.push(0xf6),
    }
}

fn encode_integer(buf: &mut Vec<u8>, n: i128) {
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, ...
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Item<'_>, Item<'_>)]) {
    let mut pairs: Vec<(Vec<u8>, &Item<'_>)> = entries
        .iter()
        .map(|(k, v)| (encode_item(k), v))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_item_to(buf, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_encoding_is_minimal() {
        let cases: &[(i64, &[u8])] = &[
            (0, &[0x00]),
            (23, &[0x17]),
            (24, &[0x18, 0x18]),
            (255, &[0x18, 0xff]),
            (256, &[0x19, 0x01, 0x00]),
            (65_536, &[0x1a, 0x00, 0x01, 0x00, 0x00]),
            (-1, &[0x20]),
            (-25, &[0x38, 0x18]),
        ];
        for (n, expected) in cases {
            assert_eq!(
                encode_canonical(&Value::Integer((*n).into())).unwrap(),
                *expected,
                "encoding of {}",
                n
            );
        }
    }

    fn int(n: i64) -> Value {
        Value::Integer(n.into())
    }

    #[test]
    fn test_map_keys_sorted_regardless_of_insertion_order() {
        let forward = Value::Map(vec![(int(0), int(1)), (int(1), int(2))]);
        let reversed = Value::Map(vec![(int(1), int(2)), (int(0), int(1))]);
        assert_eq!(
            encode_canonical(&forward).unwrap(),
            encode_canonical(&reversed).unwrap()
        );
        assert_eq!(
            encode_canonical(&forward).unwrap(),
            vec![0xa2, 0x00, 0x01, 0x01, 0x02]
        );
    }

    #[test]
    fn test_non_canonical_values_are_errors() {
        assert!(matches!(
            encode_canonical(&Value::Float(1.5)),
            Err(CoreError::EncodingError(_))
        ));
        let nested = Value::Array(vec![int(1), Value::Map(vec![(int(0), Value::Float(0.0))])]);
        assert!(matches!(
            encode_canonical(&nested),
            Err(CoreError::EncodingError(_))
        ));
        let tagged = Value::Tag(1, Box::new(int(0)));
        assert!(matches!(
            encode_canonical(&tagged),
            Err(CoreError::EncodingError(_))
        ));
    }

    #[test]
    fn test_statement_bytes_commit_to_every_field() {
        let base = statement_bytes("we will lower taxes", "speaker-1", 1_000);
        assert_ne!(base, statement_bytes("we will raise taxes", "speaker-1", 1_000));
        assert_ne!(base, statement_bytes("we will lower taxes", "speaker-2", 1_000));
        assert_ne!(base, statement_bytes("we will lower taxes", "speaker-1", 1_001));
        assert_eq!(base, statement_bytes("we will lower taxes", "speaker-1", 1_000));
    }

    #[test]
    fn test_statement_bytes_decode_as_cbor() {
        let bytes = statement_bytes("text", "speaker", -5);
        let decoded: Value = ciborium::from_reader(&bytes[..]).unwrap();
        let Value::Map(entries) = decoded else {
            panic!("expected map");
        };
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].1, Value::Text("text".into()));
        assert_eq!(entries[2].1, Value::Integer((-5i64).into()));
    }
}
