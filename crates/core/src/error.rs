//! Core Error Types
//!
//! Foundational error types shared across the Callsight workspace. These are
//! dependency-free (only thiserror + serde_json) so the core crate stays
//! lightweight; the substrate and runtime crates add their own variants for
//! transport and scheduling concerns.

use thiserror::Error;

/// Core error type for the Callsight workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration errors (bad weight override, unknown pillar id, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors (out-of-range score, empty chunk, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown session, agent, or rule id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Parse errors (malformed model payloads, unparseable fragments)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
