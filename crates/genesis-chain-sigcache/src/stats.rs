//! Cache hit/miss accounting.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of cache performance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub keypair_hits: u64,
    pub keypair_misses: u64,
    pub verification_hits: u64,
    pub verification_misses: u64,
    /// Signs, verifications and key derivations served, batches included.
    pub total_operations: u64,
    pub batch_calls: u64,
    pub keypair_entries: usize,
    pub verification_entries: usize,
}

impl CacheStats {
    /// Fraction of verifications answered from the cache.
    pub fn verification_hit_rate(&self) -> f64 {
        let total = self.verification_hits + self.verification_misses;
        if total == 0 {
            0.0
        } else {
            self.verification_hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub keypair_hits: AtomicU64,
    pub keypair_misses: AtomicU64,
    pub verification_hits: AtomicU64,
    pub verification_misses: AtomicU64,
    pub total_operations: AtomicU64,
    pub batch_calls: AtomicU64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, keypair_entries: usize, verification_entries: usize) -> CacheStats {
        CacheStats {
            keypair_hits: self.keypair_hits.load(Ordering::Relaxed),
            keypair_misses: self.keypair_misses.load(Ordering::Relaxed),
            verification_hits: self.verification_hits.load(Ordering::Relaxed),
            verification_misses: self.verification_misses.load(Ordering::Relaxed),
            total_operations: self.total_operations.load(Ordering::Relaxed),
            batch_calls: self.batch_calls.load(Ordering::Relaxed),
            keypair_entries,
            verification_entries,
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.keypair_hits,
            &self.keypair_misses,
            &self.verification_hits,
            &self.verification_misses,
            &self.total_operations,
            &self.batch_calls,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
