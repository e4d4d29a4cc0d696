//! SQLite Store Module
//!
//! Keeps the authoritative key-value rows in a single SQLite table:
//!
//! ```sql
//! CREATE TABLE kv_table (k INTEGER PRIMARY KEY, v TEXT NOT NULL)
//! ```

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::store::{ConnectionPool, KvStore, PoolConfig, PoolStatus};

const CREATE_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS kv_table (k INTEGER PRIMARY KEY, v TEXT NOT NULL)";
const UPSERT: &str =
    "INSERT INTO kv_table (k, v) VALUES (?1, ?2) ON CONFLICT(k) DO UPDATE SET v = excluded.v";
const SELECT: &str = "SELECT v FROM kv_table WHERE k = ?1";
const DELETE: &str = "DELETE FROM kv_table WHERE k = ?1";

// == SQLite Store ==
#[derive(Debug)]
pub struct SqliteStore {
    pool: ConnectionPool,
}

impl SqliteStore {
    /// Creates the pool and makes sure the table exists.
    pub fn open(config: PoolConfig) -> Result<Self, StoreError> {
        let path = config.path.clone();
        let store = Self {
            pool: ConnectionPool::new(config),
        };
        store.with_connection("create table", |conn| conn.execute_batch(CREATE_TABLE))?;
        info!("SQLite store ready at {}", path);
        Ok(store)
    }

    pub fn pool_status(&self) -> PoolStatus {
        self.pool.status()
    }

    /// Runs `f` on a pooled connection. Failures that point at the connection
    /// itself retire it so the next operation starts on a fresh one; query
    /// failures such as a busy timeout keep it pooled.
    fn with_connection<T, F>(&self, op: &str, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let mut conn = self.pool.checkout()?;
        match f(&*conn) {
            Ok(value) => Ok(value),
            Err(err) => {
                debug!("SQLite {} failed: {}", op, err);
                if retires_connection(&err) {
                    conn.mark_broken();
                }
                Err(err.into())
            }
        }
    }
}

/// True for errors after which the connection should not be reused.
fn retires_connection(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => matches!(
            failure.code,
            ErrorCode::CannotOpen
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::NotADatabase
                | ErrorCode::SystemIoFailure
                | ErrorCode::InternalMalfunction
                | ErrorCode::OutOfMemory
                | ErrorCode::ApiMisuse
        ),
        _ => false,
    }
}

impl KvStore for SqliteStore {
    fn write(&self, key: i64, value: &str) -> Result<(), StoreError> {
        self.with_connection("upsert", |conn| {
            conn.execute(UPSERT, params![key, value]).map(|_| ())
        })
    }

    fn read(&self, key: i64) -> Result<Option<String>, StoreError> {
        self.with_connection("select", |conn| {
            conn.query_row(SELECT, params![key], |row| row.get(0))
                .optional()
        })
    }

    fn delete(&self, key: i64) -> Result<(), StoreError> {
        self.with_connection("delete", |conn| {
            conn.execute(DELETE, params![key]).map(|_| ())
        })
    }

    fn ping(&self) -> Result<(), StoreError> {
        self.with_connection("ping", |conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map(|_| ())
        })
    }

    fn close(&self) {
        self.pool.close();
    }
}
