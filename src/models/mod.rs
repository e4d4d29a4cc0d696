//! Request and Response models for the key-value server API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::CreateRequest;
pub use responses::{
    CreateResponse, DeleteResponse, ErrorResponse, HealthResponse, ReadResponse, ReadSource,
    StatsResponse,
};
