//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::MAX_KEY_LENGTH;

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: The document to store
/// - `dependencies`: Keys this entry depends on (dependency policy only)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: Value,
    /// Keys whose invalidation also invalidates this entry
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            ));
        }
        if self.dependencies.iter().any(String::is_empty) {
            return Some("Dependency keys cannot be empty".to_string());
        }
        None
    }
}

/// Query string for DELETE /invalidate
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateQuery {
    /// Regular expression matched against cached keys
    pub pattern: String,
}
