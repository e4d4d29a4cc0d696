//! API Module
//!
//! HTTP handlers and routing for the key-value server REST API.
//!
//! # Endpoints
//! - `POST /create` - Store or overwrite a key-value pair
//! - `GET /read/:key` - Read a value by key
//! - `DELETE /delete/:key` - Delete a key
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
