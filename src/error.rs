//! Error type shared by the engine and the CLI host.

use crate::fields::Status;

/// Errors produced by board operations.
///
/// `NotFound`, `PolicyViolation`, `Validation` and `AccessDenied` never leave
/// partial mutations behind: the store is unchanged when they are returned.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("WIP limit reached: '{column}' holds {count} of {limit} tasks")]
    PolicyViolation {
        column: Status,
        limit: usize,
        count: usize,
    },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),
}

/// Result type alias for board operations.
pub type Result<T> = std::result::Result<T, Error>;
