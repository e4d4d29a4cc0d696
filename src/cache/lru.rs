//! LRU Cache Module
//!
//! Fixed-capacity least-recently-used cache from integer keys to string
//! values. Entries live in a slot vector linked into a recency list by index;
//! a hash index maps keys to slots, so lookup, promotion and eviction are all
//! O(1). One mutex guards the whole structure.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::cache::{CacheEntry, CacheStats};

// == LRU Core ==
/// Single-threaded LRU state. Thread safety comes from [`LruCache`].
///
/// The list runs from `head` (most recently used) to `tail` (least recently
/// used). Slots listed in `free` are not linked and not indexed.
#[derive(Debug)]
struct LruCore {
    slots: Vec<CacheEntry>,
    free: Vec<usize>,
    index: HashMap<i64, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    capacity: usize,
    stats: CacheStats,
}

impl LruCore {
    fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity.saturating_add(1)),
            free: Vec::new(),
            index: HashMap::with_capacity(capacity.saturating_add(1)),
            head: None,
            tail: None,
            capacity,
            stats: CacheStats::new(capacity),
        }
    }

    fn get(&mut self, key: i64) -> Option<String> {
        match self.index.get(&key).copied() {
            Some(slot) => {
                self.promote(slot);
                self.stats.record_hit();
                Some(self.slots[slot].value.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    fn put(&mut self, key: i64, value: String) -> Option<i64> {
        if self.capacity == 0 {
            return None;
        }

        if let Some(slot) = self.index.get(&key).copied() {
            self.slots[slot].value = value;
            self.promote(slot);
            return None;
        }

        let slot = self.alloc(key, value);
        self.index.insert(key, slot);
        self.attach_front(slot);

        if self.index.len() > self.capacity {
            self.evict_lru()
        } else {
            None
        }
    }

    fn remove(&mut self, key: i64) -> Option<String> {
        let slot = self.index.remove(&key)?;
        self.detach(slot);
        Some(self.release(slot))
    }

    fn evict_lru(&mut self) -> Option<i64> {
        let slot = self.tail?;
        let key = self.slots[slot].key;
        self.index.remove(&key);
        self.detach(slot);
        self.release(slot);
        self.stats.record_eviction();
        Some(key)
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
    }

    // == Slot Management ==
    fn alloc(&mut self, key: i64, value: String) -> usize {
        let entry = CacheEntry::new(key, value);
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = entry;
                slot
            }
            None => {
                self.slots.push(entry);
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, slot: usize) -> String {
        self.free.push(slot);
        std::mem::take(&mut self.slots[slot].value)
    }

    // == List Links ==
    fn promote(&mut self, slot: usize) {
        if self.head != Some(slot) {
            self.detach(slot);
            self.attach_front(slot);
        }
    }

    fn detach(&mut self, slot: usize) {
        let (prev, next) = {
            let entry = &self.slots[slot];
            (entry.prev, entry.next)
        };

        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }

        let entry = &mut self.slots[slot];
        entry.prev = None;
        entry.next = None;
    }

    fn attach_front(&mut self, slot: usize) {
        let old_head = self.head;
        {
            let entry = &mut self.slots[slot];
            entry.prev = None;
            entry.next = old_head;
        }
        match old_head {
            Some(h) => self.slots[h].prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
    }

    // == Diagnostics ==
    fn keys_by_recency(&self) -> Vec<i64> {
        let mut keys = Vec::with_capacity(self.index.len());
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            keys.push(self.slots[slot].key);
            cursor = self.slots[slot].next;
        }
        keys
    }

    fn validate(&self) -> Result<(), String> {
        if self.index.len() > self.capacity {
            return Err(format!(
                "size {} exceeds capacity {}",
                self.index.len(),
                self.capacity
            ));
        }
        if self.index.len() + self.free.len() != self.slots.len() {
            return Err(format!(
                "{} indexed + {} free slots != {} total",
                self.index.len(),
                self.free.len(),
                self.slots.len()
            ));
        }

        let mut visited = 0usize;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            visited += 1;
            if visited > self.index.len() {
                return Err("recency list is longer than the index (cycle?)".to_string());
            }
            let entry = &self.slots[slot];
            if entry.prev != prev {
                return Err(format!("slot {} has a broken back link", slot));
            }
            if self.index.get(&entry.key) != Some(&slot) {
                return Err(format!("key {} is not indexed at slot {}", entry.key, slot));
            }
            prev = Some(slot);
            cursor = entry.next;
        }

        if visited != self.index.len() {
            return Err(format!(
                "recency list has {} entries, index has {}",
                visited,
                self.index.len()
            ));
        }
        if self.tail != prev {
            return Err("tail does not point at the last list entry".to_string());
        }
        if let Some(slot) = self.free.iter().find(|&&slot| !self.slots[slot].is_detached()) {
            return Err(format!("freed slot {} is still linked", slot));
        }
        Ok(())
    }
}

// == LRU Cache ==
/// Thread-safe fixed-capacity LRU cache.
///
/// Every operation takes the same exclusive lock, so no caller ever sees a
/// half-updated structure and the size never exceeds the capacity.
#[derive(Debug)]
pub struct LruCache {
    inner: Mutex<LruCore>,
}

impl LruCache {
    // == Constructor ==
    /// Creates an empty cache. A capacity of 0 accepts no entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCore::new(capacity)),
        }
    }

    // == Get ==
    /// Returns the value for `key` and marks it most recently used.
    pub fn get(&self, key: i64) -> Option<String> {
        self.inner.lock().get(key)
    }

    // == Put ==
    /// Inserts or overwrites `key` and marks it most recently used.
    ///
    /// Returns the key evicted to make room, if any.
    pub fn put(&self, key: i64, value: String) -> Option<i64> {
        self.inner.lock().put(key, value)
    }

    // == Remove ==
    /// Removes `key`. Returns false if it was not cached.
    pub fn remove(&self, key: i64) -> bool {
        self.inner.lock().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Drops every entry. Counters are kept.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    // == Stats ==
    /// Returns a snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        let core = self.inner.lock();
        let mut stats = core.stats.clone();
        stats.set_total_entries(core.index.len());
        stats
    }

    /// Cached keys, most recently used first.
    pub fn keys_by_recency(&self) -> Vec<i64> {
        self.inner.lock().keys_by_recency()
    }

    /// Checks that the index and the recency list agree.
    pub fn validate_invariants(&self) -> Result<(), String> {
        self.inner.lock().validate()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> String {
        v.to_string()
    }

    #[test]
    fn test_lru_new() {
        let cache = LruCache::new(3);
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 3);
        assert!(cache.validate_invariants().is_ok());
    }

    #[test]
    fn test_put_and_get() {
        let cache = LruCache::new(3);
        cache.put(1, s("one"));

        assert_eq!(cache.get(1), Some(s("one")));
        assert_eq!(cache.get(2), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_overwrite_keeps_single_entry() {
        let cache = LruCache::new(3);
        cache.put(1, s("a"));
        cache.put(1, s("b"));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(1), Some(s("b")));
        assert!(cache.validate_invariants().is_ok());
    }

    #[test]
    fn test_capacity_two_example() {
        let cache = LruCache::new(2);
        cache.put(1, s("a"));
        cache.put(2, s("b"));
        cache.get(1);
        let evicted = cache.put(3, s("c"));

        assert_eq!(evicted, Some(2));
        assert_eq!(cache.keys_by_recency(), vec![3, 1]);
        assert_eq!(cache.get(2), None);
        assert_eq!(cache.get(1), Some(s("a")));
        assert_eq!(cache.get(3), Some(s("c")));
    }

    #[test]
    fn test_eviction_order_without_access() {
        let cache = LruCache::new(3);
        for k in 1..=3 {
            cache.put(k, k.to_string());
        }

        assert_eq!(cache.put(4, s("4")), Some(1));
        assert_eq!(cache.put(5, s("5")), Some(2));
        assert_eq!(cache.keys_by_recency(), vec![5, 4, 3]);
    }

    #[test]
    fn test_overwrite_promotes() {
        let cache = LruCache::new(2);
        cache.put(1, s("a"));
        cache.put(2, s("b"));
        cache.put(1, s("a2"));

        assert_eq!(cache.put(3, s("c")), Some(2));
    }

    #[test]
    fn test_miss_has_no_side_effects() {
        let cache = LruCache::new(2);
        cache.put(1, s("a"));
        cache.put(2, s("b"));
        cache.get(99);

        assert_eq!(cache.keys_by_recency(), vec![2, 1]);
    }

    #[test]
    fn test_remove() {
        let cache = LruCache::new(3);
        cache.put(1, s("a"));
        cache.put(2, s("b"));
        cache.put(3, s("c"));

        assert!(cache.remove(2));
        assert!(!cache.remove(2));
        assert_eq!(cache.keys_by_recency(), vec![3, 1]);
        assert!(cache.validate_invariants().is_ok());
    }

    #[test]
    fn test_remove_nonexistent_key() {
        let cache = LruCache::new(3);
        cache.put(1, s("a"));

        assert!(!cache.remove(42));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_freed_slot_is_reused() {
        let cache = LruCache::new(2);
        cache.put(1, s("a"));
        cache.put(2, s("b"));
        cache.remove(1);
        cache.put(3, s("c"));
        cache.put(4, s("d"));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.keys_by_recency(), vec![4, 3]);
        assert!(cache.validate_invariants().is_ok());
    }

    #[test]
    fn test_validate_rejects_linked_free_slot() {
        let mut core = LruCore::new(3);
        core.put(1, s("a"));
        core.put(2, s("b"));
        core.remove(1);
        assert!(core.validate().is_ok());

        let freed = core.free[0];
        core.slots[freed].next = core.head;
        assert!(core.validate().is_err());
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let cache = LruCache::new(0);
        assert_eq!(cache.put(1, s("a")), None);
        assert!(cache.is_empty());
        assert_eq!(cache.get(1), None);
    }

    #[test]
    fn test_capacity_one() {
        let cache = LruCache::new(1);
        cache.put(1, s("a"));
        assert_eq!(cache.put(2, s("b")), Some(1));
        assert_eq!(cache.keys_by_recency(), vec![2]);
        assert!(cache.validate_invariants().is_ok());
    }

    #[test]
    fn test_stats_counts() {
        let cache = LruCache::new(1);
        cache.put(1, s("a"));
        cache.get(1);
        cache.get(2);
        cache.put(2, s("b"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.capacity, 1);
    }

    #[test]
    fn test_clear() {
        let cache = LruCache::new(4);
        cache.put(1, s("a"));
        cache.put(2, s("b"));
        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.keys_by_recency().is_empty());
        assert!(cache.validate_invariants().is_ok());
        cache.put(3, s("c"));
        assert_eq!(cache.get(3), Some(s("c")));
    }

    #[test]
    fn test_concurrent_access_keeps_invariants() {
        use std::sync::Arc;
        use std::thread;

        let cache = Arc::new(LruCache::new(16));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..1000i64 {
                        let key = (i * 7 + t) % 40;
                        match i % 3 {
                            0 => {
                                cache.put(key, format!("{}-{}", t, i));
                            }
                            1 => {
                                cache.get(key);
                            }
                            _ => {
                                cache.remove(key);
                            }
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= 16);
        assert!(cache.validate_invariants().is_ok());
    }
}
