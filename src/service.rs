//! Cache-Aside Service
//!
//! Coordinates the LRU cache with the durable store. The store is always
//! touched first:
//!
//! - write: store upsert, then cache put
//! - read: cache get; on a miss, store read, then cache put
//! - delete: store delete, then cache remove
//!
//! A failed store call ends the operation without touching the cache, so the
//! cache never holds a value the store did not accept. The only staleness is
//! the gap between a store call returning and the matching cache update.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{build_cache, KvCache};
use crate::config::Config;
use crate::error::{ServiceError, StoreError};
use crate::store::{open_store, KvStore};

/// Behaviour switches for [`CacheAside`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceOptions {
    /// Read the key before deleting and report `NotFound` when absent.
    /// Off by default: delete is idempotent.
    pub delete_checks_existence: bool,
}

/// Result of a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Served from the cache
    Hit(String),
    /// Read from the store and written back into the cache
    Loaded(String),
    /// Absent from the store
    NotFound,
}

impl Lookup {
    pub fn into_value(self) -> Option<String> {
        match self {
            Lookup::Hit(v) | Lookup::Loaded(v) => Some(v),
            Lookup::NotFound => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }
}

// == Cache-Aside Service ==
pub struct CacheAside {
    cache: Box<dyn KvCache>,
    store: Arc<dyn KvStore>,
    options: ServiceOptions,
    shut_down: AtomicBool,
}

impl CacheAside {
    // == Constructor ==
    pub fn new(cache: Box<dyn KvCache>, store: Arc<dyn KvStore>, options: ServiceOptions) -> Self {
        Self {
            cache,
            store,
            options,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Builds the cache and opens the store described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        let store = open_store(config)?;
        let cache = build_cache(config.cache_capacity, config.cache_shards);
        let options = ServiceOptions {
            delete_checks_existence: config.delete_checks_existence,
        };
        Ok(Self::new(cache, store, options))
    }

    pub fn cache(&self) -> &dyn KvCache {
        self.cache.as_ref()
    }

    fn ensure_running(&self) -> Result<(), ServiceError> {
        if self.shut_down.load(Ordering::SeqCst) {
            Err(ServiceError::ShutDown)
        } else {
            Ok(())
        }
    }

    /// Caches the pair unless the service shut down meanwhile. The flag is
    /// set before `shutdown` clears the cache, so checking it after the put
    /// catches a put that landed after the clear.
    fn cache_put(&self, key: i64, value: String) {
        if let Some(evicted) = self.cache.put(key, value) {
            debug!("Evicted key {} while caching key {}", evicted, key);
        }
        if self.shut_down.load(Ordering::SeqCst) {
            self.cache.remove(key);
        }
    }

    // == Write ==
    /// Stores the pair durably, then caches it.
    pub fn write(&self, key: i64, value: String) -> Result<(), ServiceError> {
        self.ensure_running()?;

        if let Err(err) = self.store.write(key, &value) {
            warn!("Store write failed for key {}: {}", key, err);
            return Err(err.into());
        }

        self.cache_put(key, value);
        Ok(())
    }

    // == Read ==
    /// Returns the value from the cache, falling back to the store and
    /// repopulating the cache on a miss.
    pub fn read(&self, key: i64) -> Result<Lookup, ServiceError> {
        self.ensure_running()?;

        if let Some(value) = self.cache.get(key) {
            debug!("Cache hit for key {}", key);
            return Ok(Lookup::Hit(value));
        }

        let stored = match self.store.read(key) {
            Ok(stored) => stored,
            Err(err) => {
                warn!("Store read failed for key {}: {}", key, err);
                return Err(err.into());
            }
        };

        match stored {
            Some(value) => {
                debug!("Cache miss for key {}, loaded from store", key);
                self.cache_put(key, value.clone());
                Ok(Lookup::Loaded(value))
            }
            None => {
                debug!("Key {} not found", key);
                Ok(Lookup::NotFound)
            }
        }
    }

    // == Delete ==
    /// Deletes the key from the store, then from the cache.
    pub fn delete(&self, key: i64) -> Result<(), ServiceError> {
        self.ensure_running()?;

        if self.options.delete_checks_existence {
            match self.store.read(key) {
                Ok(Some(_)) => {}
                Ok(None) => return Err(ServiceError::NotFound(key)),
                Err(err) => {
                    warn!("Store existence check failed for key {}: {}", key, err);
                    return Err(err.into());
                }
            }
        }

        if let Err(err) = self.store.delete(key) {
            warn!("Store delete failed for key {}: {}", key, err);
            return Err(err.into());
        }

        self.cache.remove(key);
        Ok(())
    }

    /// Checks that the store answers.
    pub fn ping_store(&self) -> Result<(), ServiceError> {
        self.ensure_running()?;
        self.store.ping().map_err(ServiceError::from)
    }

    // == Shutdown ==
    /// Empties the cache and closes the store. Idempotent; every later
    /// operation fails with [`ServiceError::ShutDown`]. Operations already
    /// past their running check may still finish against the store, but
    /// leave nothing in the cache.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cache.clear();
        self.store.close();
        info!("Cache-aside service shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}
