//! Connection Pool Module
//!
//! Bounded pool of SQLite connections. Connections are opened lazily up to
//! `max_size`; callers that find the pool exhausted wait for a returned
//! connection until the checkout timeout expires.

use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::error::StoreError;

/// Pool parameters.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// SQLite database file
    pub path: String,
    /// Maximum number of open connections
    pub max_size: usize,
    /// How long `checkout` waits for a free connection
    pub checkout_timeout: Duration,
    /// SQLite busy timeout set on every connection
    pub busy_timeout: Duration,
}

/// Point-in-time pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub max_size: usize,
    pub open: usize,
    pub idle: usize,
}

#[derive(Debug)]
struct PoolState {
    idle: Vec<Connection>,
    open: usize,
    closed: bool,
}

// == Connection Pool ==
#[derive(Debug)]
pub struct ConnectionPool {
    config: PoolConfig,
    state: Mutex<PoolState>,
    available: Condvar,
}

impl ConnectionPool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            state: Mutex::new(PoolState {
                idle: Vec::with_capacity(config.max_size),
                open: 0,
                closed: false,
            }),
            available: Condvar::new(),
            config,
        }
    }

    // == Checkout ==
    /// Takes a connection out of the pool, opening one if the pool is not
    /// yet full. The connection goes back when the guard is dropped.
    pub fn checkout(&self) -> Result<PooledConnection<'_>, StoreError> {
        let deadline = Instant::now() + self.config.checkout_timeout;
        let mut state = self.state.lock();

        loop {
            if state.closed {
                return Err(StoreError::PoolClosed);
            }
            if let Some(conn) = state.idle.pop() {
                return Ok(PooledConnection::new(self, conn));
            }
            if state.open < self.config.max_size {
                state.open += 1;
                drop(state);
                return match self.connect() {
                    Ok(conn) => Ok(PooledConnection::new(self, conn)),
                    Err(err) => {
                        self.release_slot();
                        Err(err)
                    }
                };
            }
            if self.available.wait_until(&mut state, deadline).timed_out() {
                warn!(
                    "No store connection free after {:?} ({} open)",
                    self.config.checkout_timeout, state.open
                );
                return Err(StoreError::PoolTimeout(
                    self.config.checkout_timeout.as_millis() as u64,
                ));
            }
        }
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.config.path)
            .map_err(|e| StoreError::Connect(e.to_string()))?;
        conn.busy_timeout(self.config.busy_timeout)
            .map_err(|e| StoreError::Connect(e.to_string()))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .map_err(|e| StoreError::Connect(e.to_string()))?;
        debug!("Opened store connection to {}", self.config.path);
        Ok(conn)
    }

    fn checkin(&self, conn: Connection, broken: bool) {
        let discarded = {
            let mut state = self.state.lock();
            if broken || state.closed {
                state.open -= 1;
                Some(conn)
            } else {
                state.idle.push(conn);
                None
            }
        };
        self.available.notify_one();

        // Closed outside the lock.
        if let Some(conn) = discarded {
            drop(conn);
            if broken {
                debug!("Discarded broken store connection");
            }
        }
    }

    fn release_slot(&self) {
        self.state.lock().open -= 1;
        self.available.notify_one();
    }

    // == Close ==
    /// Drops idle connections and refuses further checkouts. Connections
    /// currently checked out are closed when they are returned.
    pub fn close(&self) {
        let idle = {
            let mut state = self.state.lock();
            state.closed = true;
            state.open -= state.idle.len();
            std::mem::take(&mut state.idle)
        };
        self.available.notify_all();
        info!("Store connection pool closed ({} idle connections dropped)", idle.len());
    }

    pub fn status(&self) -> PoolStatus {
        let state = self.state.lock();
        PoolStatus {
            max_size: self.config.max_size,
            open: state.open,
            idle: state.idle.len(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

// == Pooled Connection ==
/// A checked-out connection. Returned to the pool on drop, on every path.
pub struct PooledConnection<'a> {
    pool: &'a ConnectionPool,
    conn: Option<Connection>,
    broken: bool,
}

impl<'a> PooledConnection<'a> {
    fn new(pool: &'a ConnectionPool, conn: Connection) -> Self {
        Self {
            pool,
            conn: Some(conn),
            broken: false,
        }
    }

    /// Closes the connection on return instead of reusing it.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection is present until drop")
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection is present until drop")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.checkin(conn, self.broken);
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    static DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn temp_db_path() -> String {
        let n = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir()
            .join(format!("kv_pool_test_{}_{}.sqlite3", std::process::id(), n))
            .to_string_lossy()
            .into_owned()
    }

    fn test_pool(max_size: usize, timeout_ms: u64) -> ConnectionPool {
        ConnectionPool::new(PoolConfig {
            path: temp_db_path(),
            max_size,
            checkout_timeout: Duration::from_millis(timeout_ms),
            busy_timeout: Duration::from_millis(1000),
        })
    }

    #[test]
    fn test_connections_open_lazily() {
        let pool = test_pool(4, 100);
        assert_eq!(pool.status().open, 0);

        {
            let conn = pool.checkout().unwrap();
            conn.execute_batch("SELECT 1").unwrap();
            assert_eq!(pool.status().open, 1);
            assert_eq!(pool.status().idle, 0);
        }

        let status = pool.status();
        assert_eq!(status.open, 1);
        assert_eq!(status.idle, 1);
    }

    #[test]
    fn test_idle_connection_is_reused() {
        let pool = test_pool(4, 100);
        drop(pool.checkout().unwrap());
        drop(pool.checkout().unwrap());
        assert_eq!(pool.status().open, 1);
    }

    #[test]
    fn test_exhausted_pool_times_out() {
        let pool = test_pool(1, 50);
        let _held = pool.checkout().unwrap();

        let result = pool.checkout();
        assert!(matches!(result, Err(StoreError::PoolTimeout(50))));
    }

    #[test]
    fn test_waiter_gets_returned_connection() {
        let pool = Arc::new(test_pool(1, 2000));
        let held = pool.checkout().unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.checkout().map(|_| ()).is_ok())
        };

        thread::sleep(Duration::from_millis(50));
        drop(held);
        assert!(waiter.join().unwrap());
        assert_eq!(pool.status().open, 1);
    }

    #[test]
    fn test_broken_connection_is_discarded() {
        let pool = test_pool(2, 100);
        {
            let mut conn = pool.checkout().unwrap();
            conn.mark_broken();
        }
        let status = pool.status();
        assert_eq!(status.open, 0);
        assert_eq!(status.idle, 0);
    }

    #[test]
    fn test_close_refuses_checkout() {
        let pool = test_pool(2, 100);
        drop(pool.checkout().unwrap());
        pool.close();

        assert!(pool.is_closed());
        assert_eq!(pool.status().open, 0);
        assert!(matches!(pool.checkout(), Err(StoreError::PoolClosed)));
    }

    #[test]
    fn test_connection_returned_after_close_is_dropped() {
        let pool = test_pool(2, 100);
        let conn = pool.checkout().unwrap();
        pool.close();
        assert_eq!(pool.status().open, 1);

        drop(conn);
        assert_eq!(pool.status().open, 0);
        assert_eq!(pool.status().idle, 0);
    }

    #[test]
    fn test_connect_failure_frees_slot() {
        let pool = ConnectionPool::new(PoolConfig {
            path: "/nonexistent-dir/for/sure/db.sqlite3".to_string(),
            max_size: 1,
            checkout_timeout: Duration::from_millis(50),
            busy_timeout: Duration::from_millis(50),
        });

        assert!(matches!(pool.checkout(), Err(StoreError::Connect(_))));
        assert_eq!(pool.status().open, 0);
    }
}
