//! A bounded LRU split into independently locked shards.

use lru::LruCache;
use parking_lot::Mutex;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Keys that choose their own shard.
///
/// Every key in this crate is built from uniformly distributed digests, so
/// a few key bytes are enough to spread entries evenly.
pub trait ShardKey: Hash + Eq {
    /// Any 64 bits of the key; the shard is this value modulo the shard count.
    fn shard_hint(&self) -> u64;
}

/// LRU cache split across `shards` mutexes.
///
/// Capacity is divided evenly between shards, so eviction is per shard and
/// total occupancy never exceeds the configured capacity rounded up to a
/// multiple of the shard count.
pub struct ShardedLru<K, V> {
    shards: Vec<Mutex<LruCache<K, V>>>,
}

impl<K: ShardKey, V: Clone> ShardedLru<K, V> {
    /// A cache holding about `capacity` entries across `shards` locks.
    ///
    /// Zero shards or zero capacity are raised to one, so every shard holds
    /// at least one entry.
    pub fn new(capacity: usize, shards: usize) -> Self {
        let shards = shards.max(1);
        let per_shard =
            NonZeroUsize::new(capacity.div_ceil(shards).max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            shards: (0..shards)
                .map(|_| Mutex::new(LruCache::new(per_shard)))
                .collect(),
        }
    }

    fn shard(&self, key: &K) -> &Mutex<LruCache<K, V>> {
        let index = (key.shard_hint() % self.shards.len() as u64) as usize;
        &self.shards[index]
    }

    /// Look up and promote an entry.
    pub fn get(&self, key: &K) -> Option<V> {
        self.shard(key).lock().get(key).cloned()
    }

    /// Insert or overwrite. Re-inserting the same value is harmless.
    pub fn put(&self, key: K, value: V) {
        self.shard(&key).lock().put(key, value);
    }

    /// Entries across all shards. Locks each shard in turn, so concurrent
    /// writers may make the total approximate.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    /// Whether no shard holds an entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of the per-shard capacities, which may exceed the requested
    /// capacity by less than one entry per shard.
    pub fn capacity(&self) -> usize {
        self.shards.iter().map(|s| s.lock().cap().get()).sum()
    }

    /// Drop every entry, keeping capacity.
    pub fn clear(&self) {
        for shard in &self.shards {
            shard.lock().clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Hash, PartialEq, Eq)]
    struct Key(u64);

    impl ShardKey for Key {
        fn shard_hint(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn test_capacity_is_bounded() {
        let cache: ShardedLru<Key, u64> = ShardedLru::new(8, 2);
        for i in 0..100 {
            cache.put(Key(i), i);
        }
        assert_eq!(cache.capacity(), 8);
        assert_eq!(cache.len(), 8);
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let cache: ShardedLru<Key, u64> = ShardedLru::new(2, 1);
        cache.put(Key(1), 1);
        cache.put(Key(2), 2);
        assert_eq!(cache.get(&Key(1)), Some(1));
        cache.put(Key(3), 3);

        assert_eq!(cache.get(&Key(2)), None);
        assert_eq!(cache.get(&Key(1)), Some(1));
        assert_eq!(cache.get(&Key(3)), Some(3));
    }

    proptest::proptest! {
        #[test]
        fn test_len_never_exceeds_capacity(
            capacity in 1usize..64,
            shards in 1usize..8,
            keys in proptest::collection::vec(0u64..256, 0..300),
        ) {
            let cache: ShardedLru<Key, u64> = ShardedLru::new(capacity, shards);
            for k in keys {
                cache.put(Key(k), k);
                proptest::prop_assert!(cache.len() <= cache.capacity());
            }
        }
    }

    #[test]
    fn test_capacity_rounds_up_per_shard() {
        let cache: ShardedLru<Key, u64> = ShardedLru::new(10, 4);
        assert_eq!(cache.capacity(), 12);
        for i in 0..4 {
            cache.put(Key(i), i);
        }
        assert_eq!(cache.len(), 4);
        assert!(!cache.is_empty());
    }

    #[test]
    fn test_zero_shards_and_capacity_are_clamped() {
        let cache: ShardedLru<Key, u64> = ShardedLru::new(0, 0);
        cache.put(Key(1), 1);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
