//! Sharded LRU Cache Module
//!
//! Splits the key space across independently locked [`LruCache`] shards to
//! cut lock contention. Each shard runs its own LRU order, so eviction is
//! only approximately global-LRU; the total capacity is the sum of the
//! shard capacities.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::cache::{CacheStats, LruCache};

// == Sharded LRU Cache ==
#[derive(Debug)]
pub struct ShardedLruCache {
    shards: Vec<LruCache>,
    seed: u64,
}

impl ShardedLruCache {
    // == Constructor ==
    /// Creates `shards` caches whose capacities sum to `total_capacity`.
    ///
    /// The remainder of an uneven split goes one slot each to the first
    /// shards. A shard count of 0 is treated as 1.
    pub fn new(total_capacity: usize, shards: usize) -> Self {
        Self::with_seed(total_capacity, shards, 0)
    }

    /// Like [`ShardedLruCache::new`] with an explicit hash seed.
    pub fn with_seed(total_capacity: usize, shards: usize, seed: u64) -> Self {
        let count = shards.max(1);
        let base = total_capacity / count;
        let extra = total_capacity % count;
        let shards = (0..count)
            .map(|i| LruCache::new(base + usize::from(i < extra)))
            .collect();

        Self { shards, seed }
    }

    /// Index of the shard responsible for `key`.
    pub fn shard_for_key(&self, key: i64) -> usize {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        key.hash(&mut hasher);
        (hasher.finish() % self.shards.len() as u64) as usize
    }

    fn shard(&self, key: i64) -> &LruCache {
        &self.shards[self.shard_for_key(key)]
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn get(&self, key: i64) -> Option<String> {
        self.shard(key).get(key)
    }

    pub fn put(&self, key: i64, value: String) -> Option<i64> {
        self.shard(key).put(key, value)
    }

    pub fn remove(&self, key: i64) -> bool {
        self.shard(key).remove(key)
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(LruCache::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shards.iter().map(LruCache::capacity).sum()
    }

    pub fn clear(&self) {
        self.shards.iter().for_each(LruCache::clear);
    }

    /// Counters summed over all shards.
    pub fn stats(&self) -> CacheStats {
        let mut total = CacheStats::default();
        for shard in &self.shards {
            total.merge(&shard.stats());
        }
        total
    }

    pub fn validate_invariants(&self) -> Result<(), String> {
        for (i, shard) in self.shards.iter().enumerate() {
            shard
                .validate_invariants()
                .map_err(|e| format!("shard {}: {}", i, e))?;
        }
        Ok(())
    }
}
