//! The optimized signature cache.

use genesis_chain_core::{
    verify_signature, CoreError, Digest, EntropySource, ExpandedKey, KeyPair, OsEntropy,
    PrivateKey, PublicKey, Signature, SignatureEngine, Signer, Verifier,
};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::debug;

use crate::config::CacheConfig;
use crate::shard::{ShardKey, ShardedLru};
use crate::stats::{CacheStats, Counters};

/// Keypair cache keys are a domain digest of the private key, never the key itself.
const KEYPAIR_KEY_DOMAIN: &str = "genesis-chain-sigcache-keypair";

impl ShardKey for Digest {
    fn shard_hint(&self) -> u64 {
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&self.as_bytes()[..8]);
        u64::from_le_bytes(prefix)
    }
}

/// Identity of one verification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VerificationKey {
    pub message_hash: Digest,
    pub signature_hash: Digest,
    pub public_key_hash: Digest,
}

impl VerificationKey {
    pub fn new(message: &[u8], signature: &[u8], public_key: &[u8]) -> Self {
        Self {
            message_hash: Digest::hash(message),
            signature_hash: Digest::hash(signature),
            public_key_hash: Digest::hash(public_key),
        }
    }
}

impl ShardKey for VerificationKey {
    fn shard_hint(&self) -> u64 {
        self.signature_hash.shard_hint()
    }
}

/// One entry of a batch verification.
#[derive(Debug, Clone, Copy)]
pub struct BatchItem<'a> {
    pub message: &'a [u8],
    pub signature: &'a [u8],
    pub public_key: &'a [u8],
}

impl<'a> BatchItem<'a> {
    pub fn new(message: &'a [u8], signature: &'a [u8], public_key: &'a [u8]) -> Self {
        Self {
            message,
            signature,
            public_key,
        }
    }
}

/// Signature engine with memoized key expansion and verification.
///
/// Safe to share across threads. Each shard is locked only for a lookup or
/// insert; signature verification itself runs outside every lock, and
/// concurrent misses for the same key store the same outcome.
pub struct SignatureCache<E: EntropySource = OsEntropy> {
    engine: SignatureEngine<E>,
    keypairs: ShardedLru<Digest, Arc<ExpandedKey>>,
    verifications: ShardedLru<VerificationKey, bool>,
    counters: Counters,
}

impl SignatureCache {
    /// Cache over an OS-entropy engine.
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_engine(SignatureEngine::new(), config)
    }
}

impl Default for SignatureCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl<E: EntropySource> SignatureCache<E> {
    /// Cache over a caller-provided engine.
    pub fn with_engine(engine: SignatureEngine<E>, config: &CacheConfig) -> Self {
        Self {
            engine,
            keypairs: ShardedLru::new(config.keypair_capacity, config.shards),
            verifications: ShardedLru::new(config.verification_capacity, config.shards),
            counters: Counters::default(),
        }
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &SignatureEngine<E> {
        &self.engine
    }

    /// Generate a keypair and remember its expanded key.
    pub fn generate_keypair(&self) -> Result<KeyPair, CoreError> {
        let keypair = self.engine.generate_keypair()?;
        self.keypairs.put(
            keypair_cache_key(keypair.private_key()),
            Arc::new(ExpandedKey::new(keypair.private_key())),
        );
        Counters::bump(&self.counters.total_operations);
        Ok(keypair)
    }

    /// Public key for `private_key`, derived at most once while cached.
    pub fn public_key_for(&self, private_key: &PrivateKey) -> PublicKey {
        Counters::bump(&self.counters.total_operations);
        self.expanded_key(private_key).public_key()
    }

    /// Sign through the wrapped engine, reusing the cached key expansion.
    /// Signatures themselves are never cached.
    pub fn sign(&self, message: &[u8], private_key: &[u8]) -> Result<Signature, CoreError> {
        Counters::bump(&self.counters.total_operations);
        if message.is_empty() {
            return Err(CoreError::InvalidInput("message must not be empty".into()));
        }
        let private_key = PrivateKey::from_slice(private_key)?;
        let key = self.expanded_key(&private_key);
        self.engine.sign_expanded(message, &key)
    }

    fn expanded_key(&self, private_key: &PrivateKey) -> Arc<ExpandedKey> {
        let cache_key = keypair_cache_key(private_key);
        if let Some(key) = self.keypairs.get(&cache_key) {
            Counters::bump(&self.counters.keypair_hits);
            return key;
        }

        Counters::bump(&self.counters.keypair_misses);
        let key = Arc::new(ExpandedKey::new(private_key));
        self.keypairs.put(cache_key, Arc::clone(&key));
        key
    }

    /// Verify, answering repeated requests from the cache.
    pub fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        Counters::bump(&self.counters.total_operations);
        let key = VerificationKey::new(message, signature, public_key);

        if let Some(outcome) = self.verifications.get(&key) {
            Counters::bump(&self.counters.verification_hits);
            return outcome;
        }

        Counters::bump(&self.counters.verification_misses);
        let outcome = verify_signature(message, signature, public_key);
        debug!(
            signature = ?key.signature_hash,
            outcome,
            "verification cache miss"
        );
        self.verifications.put(key, outcome);
        outcome
    }

    /// Verify without consulting or filling the cache.
    pub fn verify_uncached(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        verify_signature(message, signature, public_key)
    }

    /// Verify every item independently on the rayon pool.
    ///
    /// `result[i]` is the outcome for `items[i]`; a failure never stops the
    /// remaining items from being checked.
    pub fn batch_verify(&self, items: &[BatchItem<'_>]) -> Vec<bool> {
        Counters::bump(&self.counters.batch_calls);
        debug!(batch_size = items.len(), "batch verification");
        items
            .par_iter()
            .map(|item| self.verify(item.message, item.signature, item.public_key))
            .collect()
    }

    /// Current counters and occupancy.
    pub fn stats(&self) -> CacheStats {
        self.counters
            .snapshot(self.keypairs.len(), self.verifications.len())
    }

    /// Drop every cached entry and reset counters.
    pub fn clear(&self) {
        self.keypairs.clear();
        self.verifications.clear();
        self.counters.reset();
    }
}

impl<E: EntropySource> Signer for SignatureCache<E> {
    fn sign(&self, message: &[u8], private_key: &[u8]) -> Result<Signature, CoreError> {
        SignatureCache::sign(self, message, private_key)
    }
}

impl<E: EntropySource> Verifier for SignatureCache<E> {
    fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        SignatureCache::verify(self, message, signature, public_key)
    }
}

fn keypair_cache_key(private_key: &PrivateKey) -> Digest {
    Digest::hash_domain(KEYPAIR_KEY_DOMAIN, &[private_key.as_bytes()])
}
