//! Signature test vectors.
//!
//! With a fixed entropy byte the signature is fully determined by the seed
//! and message, so every vector regenerates bit-for-bit. Each vector is
//! checked for the 160-byte layout and for verification.

use genesis_chain_core::{
    Digest, KeyPair, Signature, SignatureEngine, SIGNATURE_LEN,
};

use crate::fixtures::FixedEntropy;

/// A signature test vector.
#[derive(Debug, Clone)]
pub struct SignatureVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Seed for the keypair.
    pub seed: [u8; 32],
    /// Byte repeated to fill the entropy field.
    pub entropy_byte: u8,
    pub message: &'static [u8],
}

/// Get all signature vectors.
pub fn all_vectors() -> Vec<SignatureVector> {
    vec![
        SignatureVector {
            name: "hello",
            seed: [0x42; 32],
            entropy_byte: 0x01,
            message: b"hello",
        },
        SignatureVector {
            name: "single byte",
            seed: [0x00; 32],
            entropy_byte: 0x00,
            message: b"\x00",
        },
        SignatureVector {
            name: "statement hash sized",
            seed: [0x7f; 32],
            entropy_byte: 0xff,
            message: &[0xab; 32],
        },
        SignatureVector {
            name: "longer text",
            seed: [0x13; 32],
            entropy_byte: 0x5a,
            message: b"The quick brown fox jumps over the lazy dog",
        },
    ]
}

/// Sign a vector's message deterministically.
pub fn sign_vector(vector: &SignatureVector) -> (KeyPair, Signature) {
    let keypair = KeyPair::from_seed(&vector.seed);
    let engine = SignatureEngine::with_entropy(FixedEntropy(vector.entropy_byte));
    let signature = engine
        .sign(vector.message, keypair.private_key().as_bytes())
        .expect("vector inputs are valid");
    (keypair, signature)
}

/// Check every vector. Returns `(name, passed, signature_hex)`.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let (keypair, signature) = sign_vector(v);
            let public_key = keypair.public_key();

            let layout = signature.as_bytes().len() == SIGNATURE_LEN
                && signature.entropy() == [v.entropy_byte; 32]
                && signature.public_key_hash() == public_key.hash()
                && signature.message_hash() == Digest::hash(v.message);
            let verifies = SignatureEngine::new().verify(
                v.message,
                signature.as_bytes(),
                public_key.as_bytes(),
            );

            (v.name.to_string(), layout && verifies, signature.to_hex())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_pass() {
        for (name, passed, hex) in verify_all_vectors() {
            assert!(passed, "vector '{name}' failed: {hex}");
            assert_eq!(hex.len(), SIGNATURE_LEN * 2);
        }
    }

    #[test]
    fn test_vectors_are_deterministic() {
        for vector in all_vectors() {
            let (_, s1) = sign_vector(&vector);
            let (_, s2) = sign_vector(&vector);
            assert_eq!(s1, s2, "vector '{}' regenerated differently", vector.name);
        }
    }

    #[test]
    fn test_entropy_changes_only_its_fields() {
        let vector = &all_vectors()[0];
        let (_, a) = sign_vector(vector);
        let (_, b) = sign_vector(&SignatureVector {
            entropy_byte: 0x02,
            ..vector.clone()
        });

        assert_ne!(a.core(), b.core());
        assert_ne!(a.entropy(), b.entropy());
        assert_eq!(a.public_key_hash(), b.public_key_hash());
        assert_eq!(a.message_hash(), b.message_hash());
    }
}
