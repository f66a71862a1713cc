//! Cache sizing.

use serde::{Deserialize, Serialize};

/// Capacities for the signature cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum memoized public keys.
    pub keypair_capacity: usize,

    /// Maximum memoized verification outcomes.
    pub verification_capacity: usize,

    /// Number of independently locked shards per cache.
    pub shards: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            keypair_capacity: 4096,
            verification_capacity: 16384,
            shards: 16,
        }
    }
}

impl CacheConfig {
    /// Small caches that evict quickly.
    pub fn for_testing() -> Self {
        Self {
            keypair_capacity: 8,
            verification_capacity: 32,
            shards: 2,
        }
    }
}
