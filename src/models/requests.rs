//! Request DTOs for the key-value server API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Maximum accepted value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB

/// Request body for the create-or-update operation (POST /create)
///
/// Both fields are required; a non-integer key or non-string value is
/// rejected during deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRequest {
    /// The integer key
    pub key: i64,
    /// The value to store
    pub value: String,
}

impl CreateRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.value.len() > MAX_VALUE_SIZE {
            return Some(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            ));
        }
        None
    }
}
