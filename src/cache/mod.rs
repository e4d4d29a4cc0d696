//! Cache Module
//!
//! Provides the bounded in-memory LRU cache that sits in front of the
//! durable store, plus a sharded variant for high-contention deployments.

mod entry;
mod lru;
mod sharded;
mod stats;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruCache;
pub use sharded::ShardedLruCache;
pub use stats::CacheStats;

// == Cache Trait ==
/// Operations the cache-aside service needs from a cache.
///
/// Implementations must be safe to share across worker threads; each call is
/// atomic with respect to every other call on the same cache.
pub trait KvCache: Send + Sync {
    /// Returns the cached value and promotes the key.
    fn get(&self, key: i64) -> Option<String>;

    /// Inserts or overwrites the key, evicting at most one entry.
    fn put(&self, key: i64, value: String) -> Option<i64>;

    /// Removes the key if present.
    fn remove(&self, key: i64) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;

    fn stats(&self) -> CacheStats;

    fn clear(&self);

    fn validate_invariants(&self) -> Result<(), String>;
}

impl KvCache for LruCache {
    fn get(&self, key: i64) -> Option<String> {
        LruCache::get(self, key)
    }

    fn put(&self, key: i64, value: String) -> Option<i64> {
        LruCache::put(self, key, value)
    }

    fn remove(&self, key: i64) -> bool {
        LruCache::remove(self, key)
    }

    fn len(&self) -> usize {
        LruCache::len(self)
    }

    fn capacity(&self) -> usize {
        LruCache::capacity(self)
    }

    fn stats(&self) -> CacheStats {
        LruCache::stats(self)
    }

    fn clear(&self) {
        LruCache::clear(self)
    }

    fn validate_invariants(&self) -> Result<(), String> {
        LruCache::validate_invariants(self)
    }
}

impl KvCache for ShardedLruCache {
    fn get(&self, key: i64) -> Option<String> {
        ShardedLruCache::get(self, key)
    }

    fn put(&self, key: i64, value: String) -> Option<i64> {
        ShardedLruCache::put(self, key, value)
    }

    fn remove(&self, key: i64) -> bool {
        ShardedLruCache::remove(self, key)
    }

    fn len(&self) -> usize {
        ShardedLruCache::len(self)
    }

    fn capacity(&self) -> usize {
        ShardedLruCache::capacity(self)
    }

    fn stats(&self) -> CacheStats {
        ShardedLruCache::stats(self)
    }

    fn clear(&self) {
        ShardedLruCache::clear(self)
    }

    fn validate_invariants(&self) -> Result<(), String> {
        ShardedLruCache::validate_invariants(self)
    }
}

/// Builds the cache for a configuration: a plain LRU for one shard,
/// otherwise a sharded one.
pub fn build_cache(capacity: usize, shards: usize) -> Box<dyn KvCache> {
    if shards <= 1 {
        Box::new(LruCache::new(capacity))
    } else {
        Box::new(ShardedLruCache::new(capacity, shards))
    }
}
