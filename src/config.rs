//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;

use crate::error::ConfigError;

/// Which durable store adapter to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Total number of entries the cache can hold
    pub cache_capacity: usize,
    /// Number of independently locked cache shards
    pub cache_shards: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Fixed number of request worker threads
    pub worker_threads: usize,
    /// Durable store adapter
    pub store_backend: StoreBackend,
    /// SQLite database file
    pub database_path: String,
    /// Maximum number of pooled store connections
    pub db_pool_size: usize,
    /// How long an operation waits for a free connection, in milliseconds
    pub db_checkout_timeout_ms: u64,
    /// SQLite busy timeout, in milliseconds
    pub db_busy_timeout_ms: u64,
    /// Read the key before deleting and report 404 when absent
    pub delete_checks_existence: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Total cache entries (default: 100)
    /// - `CACHE_SHARDS` - Cache shards (default: 1)
    /// - `SERVER_PORT` - HTTP server port (default: 8080)
    /// - `WORKER_THREADS` - Request worker threads (default: 4)
    /// - `STORE_BACKEND` - `sqlite` or `memory` (default: sqlite)
    /// - `DATABASE_PATH` - SQLite file (default: kv_db.sqlite3)
    /// - `DB_POOL_SIZE` - Max pooled connections (default: 8)
    /// - `DB_CHECKOUT_TIMEOUT_MS` - Connection wait (default: 5000)
    /// - `DB_BUSY_TIMEOUT_MS` - SQLite busy timeout (default: 5000)
    /// - `DELETE_CHECKS_EXISTENCE` - Read-before-delete (default: false)
    ///
    /// Unparseable values fall back to their defaults; `STORE_BACKEND` is the
    /// exception since silently switching stores would lose data.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let store_backend = match env::var("STORE_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.store_backend,
        };

        Ok(Self {
            cache_capacity: parse_var("CACHE_CAPACITY", defaults.cache_capacity),
            cache_shards: parse_var("CACHE_SHARDS", defaults.cache_shards),
            server_port: parse_var("SERVER_PORT", defaults.server_port),
            worker_threads: parse_var("WORKER_THREADS", defaults.worker_threads),
            store_backend,
            database_path: env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
            db_pool_size: parse_var("DB_POOL_SIZE", defaults.db_pool_size),
            db_checkout_timeout_ms: parse_var(
                "DB_CHECKOUT_TIMEOUT_MS",
                defaults.db_checkout_timeout_ms,
            ),
            db_busy_timeout_ms: parse_var("DB_BUSY_TIMEOUT_MS", defaults.db_busy_timeout_ms),
            delete_checks_existence: parse_var(
                "DELETE_CHECKS_EXISTENCE",
                defaults.delete_checks_existence,
            ),
        })
    }

    /// Applies command-line overrides. The first positional argument, if
    /// present and numeric, is the worker thread count.
    pub fn with_args<I>(mut self, mut args: I) -> Self
    where
        I: Iterator<Item = String>,
    {
        if let Some(threads) = args.next().and_then(|a| a.parse().ok()) {
            self.worker_threads = threads;
        }
        self
    }

    /// Checks the values the server cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("CACHE_CAPACITY", self.cache_capacity),
            ("CACHE_SHARDS", self.cache_shards),
            ("WORKER_THREADS", self.worker_threads),
            ("DB_POOL_SIZE", self.db_pool_size),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::Zero { name });
            }
        }
        if self.cache_shards > self.cache_capacity {
            return Err(ConfigError::TooManyShards {
                shards: self.cache_shards,
                capacity: self.cache_capacity,
            });
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_capacity: 100,
            cache_shards: 1,
            server_port: 8080,
            worker_threads: 4,
            store_backend: StoreBackend::Sqlite,
            database_path: "kv_db.sqlite3".to_string(),
            db_pool_size: 8,
            db_checkout_timeout_ms: 5000,
            db_busy_timeout_ms: 5000,
            delete_checks_existence: false,
        }
    }
}
