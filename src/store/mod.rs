//! Durable Store Module
//!
//! The source of truth behind the cache. The service only talks to the
//! [`KvStore`] trait; connection handling stays inside each adapter.
//!
//! # Adapters
//! - [`SqliteStore`] - SQLite table behind a bounded [`ConnectionPool`]
//! - [`MemoryStore`] - in-process map, used in tests and for local runs

mod memory;
mod pool;
mod sqlite;

use std::sync::Arc;
use std::time::Duration;

pub use memory::MemoryStore;
pub use pool::{ConnectionPool, PoolConfig, PoolStatus, PooledConnection};
pub use sqlite::SqliteStore;

use crate::config::{Config, StoreBackend};
use crate::error::StoreError;

// == Store Trait ==
/// Create-or-update, read and delete by integer key.
///
/// Calls block until the store answers. Every failure is reported as a
/// [`StoreError`]; a missing key is not a failure.
pub trait KvStore: Send + Sync {
    /// Inserts the row if absent, otherwise overwrites its value.
    fn write(&self, key: i64, value: &str) -> Result<(), StoreError>;

    /// Returns the stored value, or `None` if the key does not exist.
    fn read(&self, key: i64) -> Result<Option<String>, StoreError>;

    /// Deletes the row. Deleting a missing key succeeds.
    fn delete(&self, key: i64) -> Result<(), StoreError>;

    /// Checks that the store can serve requests.
    fn ping(&self) -> Result<(), StoreError>;

    /// Releases connections. Later calls fail.
    fn close(&self);
}

/// Opens the adapter selected by the configuration.
pub fn open_store(config: &Config) -> Result<Arc<dyn KvStore>, StoreError> {
    match config.store_backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Sqlite => {
            let pool_config = PoolConfig {
                path: config.database_path.clone(),
                max_size: config.db_pool_size,
                checkout_timeout: Duration::from_millis(config.db_checkout_timeout_ms),
                busy_timeout: Duration::from_millis(config.db_busy_timeout_ms),
            };
            Ok(Arc::new(SqliteStore::open(pool_config)?))
        }
    }
}
