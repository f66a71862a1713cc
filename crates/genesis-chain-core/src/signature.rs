//! The signature engine: keypairs, signing and verification over a fixed
//! 160-byte structure.
//!
//! ## Layout
//!
//! ```text
//! signature_core (64) || entropy (32) || public_key_hash (32) || message_hash (32)
//! ```
//!
//! `signature_core` is an Ed25519 signature over the verification challenge
//! `DOMAIN || message_hash || entropy || public_key_hash`. Only the holder of
//! the private key can produce it, and a verifier needs nothing beyond the
//! public key and the 160 bytes to check it. Internally Ed25519 binds the
//! core to the key through `H(R || public_key || challenge)`, so the challenge
//! covers `signature_core`, `public_key` and `message_hash` together.
//!
//! Signatures are non-deterministic: every call draws fresh entropy, so two
//! signatures over the same message differ but both verify.

use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Range;
use subtle::ConstantTimeEq;

use crate::digest::{random_bytes, Digest, EntropySource, OsEntropy};
use crate::error::CoreError;

/// Private key length in bytes.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Public key length in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Total signature length in bytes.
pub const SIGNATURE_LEN: usize = 160;

/// Per-signature entropy length in bytes.
pub const ENTROPY_LEN: usize = 32;

const CORE_RANGE: Range<usize> = 0..64;
const ENTROPY_RANGE: Range<usize> = 64..96;
const PUBLIC_KEY_HASH_RANGE: Range<usize> = 96..128;
const MESSAGE_HASH_RANGE: Range<usize> = 128..160;

/// Domain prefix of the verification challenge.
const CHALLENGE_DOMAIN: &[u8] = b"genesis-chain-sig-v1:";

/// A 32-byte private key (the Ed25519 secret seed).
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey([u8; PRIVATE_KEY_LEN]);

impl PrivateKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; PRIVATE_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse from a slice, rejecting anything but 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        let arr: [u8; PRIVATE_KEY_LEN] = bytes.try_into().map_err(|_| {
            CoreError::InvalidInput(format!(
                "private key must be {} bytes, got {}",
                PRIVATE_KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes (secret key material).
    pub const fn as_bytes(&self) -> &[u8; PRIVATE_KEY_LEN] {
        &self.0
    }

    /// Derive the matching public key.
    pub fn public_key(&self) -> PublicKey {
        derive_public_key(self)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// A 32-byte public key.
///
/// Also serves as an account address on the chain. `PublicKey::ZERO` is the
/// system sender used by reward transactions.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse from a slice, rejecting anything but 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        let arr: [u8; PUBLIC_KEY_LEN] = bytes.try_into().map_err(|_| {
            CoreError::InvalidInput(format!(
                "public key must be {} bytes, got {}",
                PUBLIC_KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    /// `H(public_key)`, as embedded in signatures.
    pub fn hash(&self) -> Digest {
        Digest::hash(&self.0)
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        Digest::from_hex(s).map(|d| Self(d.0))
    }

    /// The all-zero key. Never a valid Ed25519 verifying key for signatures.
    pub const ZERO: Self = Self([0u8; PUBLIC_KEY_LEN]);
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; PUBLIC_KEY_LEN]> for PublicKey {
    fn from(bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }
}

/// A keypair. Owned exclusively by the caller that requested it.
#[derive(Clone)]
pub struct KeyPair {
    public_key: PublicKey,
    private_key: PrivateKey,
}

impl KeyPair {
    /// Build a keypair from an existing private key.
    pub fn from_private_key(private_key: PrivateKey) -> Self {
        let public_key = derive_public_key(&private_key);
        Self {
            public_key,
            private_key,
        }
    }

    /// Deterministic keypair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; PRIVATE_KEY_LEN]) -> Self {
        Self::from_private_key(PrivateKey::from_bytes(*seed))
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// Get the private key.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair({:?})", self.public_key)
    }
}

/// A private key with its Ed25519 expansion and public key hash
/// precomputed, ready to sign repeatedly.
#[derive(Clone)]
pub struct ExpandedKey {
    signing_key: SigningKey,
    public_key: PublicKey,
    public_key_hash: Digest,
}

impl ExpandedKey {
    pub fn new(private_key: &PrivateKey) -> Self {
        let signing_key = SigningKey::from_bytes(private_key.as_bytes());
        let public_key = PublicKey(signing_key.verifying_key().to_bytes());
        Self {
            public_key_hash: public_key.hash(),
            public_key,
            signing_key,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }
}

impl fmt::Debug for ExpandedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExpandedKey({:?})", self.public_key)
    }
}

/// A 160-byte structured signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl Signature {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse from a slice, rejecting anything but 160 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        let arr: [u8; SIGNATURE_LEN] = bytes.try_into().map_err(|_| {
            CoreError::InvalidInput(format!(
                "signature must be {} bytes, got {}",
                SIGNATURE_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    fn assemble(
        core: &[u8; 64],
        entropy: &[u8; ENTROPY_LEN],
        public_key_hash: &Digest,
        message_hash: &Digest,
    ) -> Self {
        let mut bytes = [0u8; SIGNATURE_LEN];
        bytes[CORE_RANGE].copy_from_slice(core);
        bytes[ENTROPY_RANGE].copy_from_slice(entropy);
        bytes[PUBLIC_KEY_HASH_RANGE].copy_from_slice(public_key_hash.as_bytes());
        bytes[MESSAGE_HASH_RANGE].copy_from_slice(message_hash.as_bytes());
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// The 64-byte keyed core.
    pub fn core(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out.copy_from_slice(&self.0[CORE_RANGE]);
        out
    }

    /// The per-signature entropy.
    pub fn entropy(&self) -> [u8; ENTROPY_LEN] {
        let mut out = [0u8; ENTROPY_LEN];
        out.copy_from_slice(&self.0[ENTROPY_RANGE]);
        out
    }

    /// The embedded `H(public_key)`.
    pub fn public_key_hash(&self) -> Digest {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.0[PUBLIC_KEY_HASH_RANGE]);
        Digest(out)
    }

    /// The embedded `H(message)`.
    pub fn message_hash(&self) -> Digest {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.0[MESSAGE_HASH_RANGE]);
        Digest(out)
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SignatureVisitor;

        impl<'de> Visitor<'de> for SignatureVisitor {
            type Value = Signature;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} signature bytes", SIGNATURE_LEN)
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Signature, E> {
                Signature::from_slice(v).map_err(E::custom)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Signature, A::Error> {
                let mut bytes = Vec::with_capacity(SIGNATURE_LEN);
                while let Some(b) = seq.next_element::<u8>()? {
                    bytes.push(b);
                }
                Signature::from_slice(&bytes).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_bytes(SignatureVisitor)
    }
}

/// Produces signatures.
pub trait Signer {
    /// Sign `message` with a 32-byte private key.
    fn sign(&self, message: &[u8], private_key: &[u8]) -> Result<Signature, CoreError>;
}

/// Checks signatures. Pure and safe to share across threads.
pub trait Verifier: Send + Sync {
    /// Accept or reject; malformed input rejects.
    fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool;
}

/// Stateless signature engine.
///
/// Holds no keys; the entropy source is the only state.
#[derive(Debug, Clone, Default)]
pub struct SignatureEngine<E: EntropySource = OsEntropy> {
    entropy: E,
}

impl SignatureEngine {
    /// Engine backed by operating-system entropy.
    pub fn new() -> Self {
        Self { entropy: OsEntropy }
    }
}

impl<E: EntropySource> SignatureEngine<E> {
    /// Engine backed by a custom entropy source.
    pub fn with_entropy(entropy: E) -> Self {
        Self { entropy }
    }

    /// Generate a fresh keypair from 32 bytes of entropy.
    pub fn generate_keypair(&self) -> Result<KeyPair, CoreError> {
        let seed: [u8; PRIVATE_KEY_LEN] = random_bytes(&self.entropy)?;
        Ok(KeyPair::from_private_key(PrivateKey::from_bytes(seed)))
    }

    /// Sign `message` with `private_key`.
    ///
    /// Fails with `InvalidInput` for an empty message or a key that is not
    /// 32 bytes, and with `EntropySourceFailure` if entropy cannot be drawn.
    pub fn sign(&self, message: &[u8], private_key: &[u8]) -> Result<Signature, CoreError> {
        if message.is_empty() {
            return Err(CoreError::InvalidInput("message must not be empty".into()));
        }
        let private_key = PrivateKey::from_slice(private_key)?;
        self.sign_expanded(message, &ExpandedKey::new(&private_key))
    }

    /// Sign `message` with an already expanded key.
    pub fn sign_expanded(&self, message: &[u8], key: &ExpandedKey) -> Result<Signature, CoreError> {
        if message.is_empty() {
            return Err(CoreError::InvalidInput("message must not be empty".into()));
        }
        let message_hash = Digest::hash(message);
        let entropy: [u8; ENTROPY_LEN] = random_bytes(&self.entropy)?;

        let challenge = verification_challenge(&message_hash, &entropy, &key.public_key_hash);
        let core = key.signing_key.sign(&challenge).to_bytes();

        Ok(Signature::assemble(
            &core,
            &entropy,
            &key.public_key_hash,
            &message_hash,
        ))
    }

    /// Verify a signature. See [`verify_signature`].
    pub fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        verify_signature(message, signature, public_key)
    }
}

impl<E: EntropySource> Signer for SignatureEngine<E> {
    fn sign(&self, message: &[u8], private_key: &[u8]) -> Result<Signature, CoreError> {
        SignatureEngine::sign(self, message, private_key)
    }
}

impl<E: EntropySource> Verifier for SignatureEngine<E> {
    fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        verify_signature(message, signature, public_key)
    }
}

/// Derive the public key for a private key (one-way).
pub fn derive_public_key(private_key: &PrivateKey) -> PublicKey {
    let signing_key = SigningKey::from_bytes(private_key.as_bytes());
    PublicKey(signing_key.verifying_key().to_bytes())
}

/// Verify `signature` over `message` against `public_key`.
///
/// Uses only public data. Rejects on wrong length, message hash mismatch,
/// public key hash mismatch, an unparseable key, or a core that fails strict
/// Ed25519 verification of the rebuilt challenge.
pub fn verify_signature(message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
    if message.is_empty() {
        return false;
    }
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    let Ok(public_key) = PublicKey::from_slice(public_key) else {
        return false;
    };

    let message_hash = Digest::hash(message);
    if !digests_equal(&message_hash, &signature.message_hash()) {
        return false;
    }

    let public_key_hash = public_key.hash();
    if !digests_equal(&public_key_hash, &signature.public_key_hash()) {
        return false;
    }

    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key.as_bytes()) else {
        return false;
    };
    let challenge = verification_challenge(&message_hash, &signature.entropy(), &public_key_hash);
    let core = ed25519_dalek::Signature::from_bytes(&signature.core());

    verifying_key.verify_strict(&challenge, &core).is_ok()
}

fn verification_challenge(
    message_hash: &Digest,
    entropy: &[u8; ENTROPY_LEN],
    public_key_hash: &Digest,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(CHALLENGE_DOMAIN.len() + 96);
    buf.extend_from_slice(CHALLENGE_DOMAIN);
    buf.extend_from_slice(message_hash.as_bytes());
    buf.extend_from_slice(entropy);
    buf.extend_from_slice(public_key_hash.as_bytes());
    buf
}

fn digests_equal(a: &Digest, b: &Digest) -> bool {
    a.as_bytes()[..].ct_eq(&b.as_bytes()[..]).into()
}
