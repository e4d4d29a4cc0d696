//! In-Memory Store Module
//!
//! A [`KvStore`] backed by a map. It counts every call and can be switched
//! into a failing mode, which makes the cache-aside ordering observable in
//! tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::StoreError;
use crate::store::KvStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<HashMap<i64, String>>,
    failing: AtomicBool,
    closed: AtomicBool,
    reads: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every operation fails with [`StoreError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Inserts a row without going through the counted write path.
    pub fn seed(&self, key: i64, value: &str) {
        self.rows.write().insert(key, value.to_string());
    }

    /// Returns the stored value without counting a read.
    pub fn peek(&self, key: i64) -> Option<String> {
        self.rows.read().get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> u64 {
        self.deletes.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::PoolClosed);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

impl KvStore for MemoryStore {
    fn write(&self, key: i64, value: &str) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.rows.write().insert(key, value.to_string());
        Ok(())
    }

    fn read(&self, key: i64) -> Result<Option<String>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.rows.read().get(&key).cloned())
    }

    fn delete(&self, key: i64) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.rows.write().remove(&key);
        Ok(())
    }

    fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
