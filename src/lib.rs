//! KV Cache-Aside - A key-value server with a bounded LRU cache in front of
//! a durable SQLite store
//!
//! Writes go to the store before the cache, read misses are served from the
//! store and written back, and deletes hit the store before the cache.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod store;

pub use api::AppState;
pub use config::Config;
pub use service::{CacheAside, Lookup, ServiceOptions};
