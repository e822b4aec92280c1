//! Error types for todos
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, ambiguous id, invalid config)
//! - 4: Operation failed (storage, lock, serialization)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the todos CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for todos operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Todo id '{id}' is ambiguous ({matches} matches)")]
    AmbiguousId { id: String, matches: usize },

    // Operation failures (exit code 4)
    #[error("Storage read failed for key '{key}': {reason}")]
    StorageRead { key: String, reason: String },

    #[error("Storage write failed for key '{key}': {reason}")]
    StorageWrite { key: String, reason: String },

    #[error("Malformed snapshot under key '{key}': {reason}")]
    MalformedSnapshot { key: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::InvalidConfig(_) | Error::InvalidArgument(_) | Error::AmbiguousId { .. } => {
                exit_codes::USER_ERROR
            }

            // Operation failures
            Error::StorageRead { .. }
            | Error::StorageWrite { .. }
            | Error::MalformedSnapshot { .. }
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::LockFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON error output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::StorageRead { key, .. }
            | Error::StorageWrite { key, .. }
            | Error::MalformedSnapshot { key, .. } => Some(serde_json::json!({ "key": key })),
            Error::AmbiguousId { id, matches } => {
                Some(serde_json::json!({ "id": id, "matches": matches }))
            }
            Error::LockFailed(path) => Some(serde_json::json!({ "path": path })),
            _ => None,
        }
    }

    /// True for failures of the persistent store write path
    pub fn is_write_failure(&self) -> bool {
        matches!(self, Error::StorageWrite { .. })
    }
}

/// Result type alias for todos operations
pub type Result<T> = std::result::Result<T, Error>;
