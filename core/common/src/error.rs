//! Common error types for Stratus.

use thiserror::Error;

/// Top-level error type for Stratus operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The external mount helper could not be launched.
    #[error("Failed to spawn mount helper: {0}")]
    Spawn(String),

    /// Every mount-point identifier has been handed out for this process.
    #[error("No mount points left in the pool")]
    PoolExhausted,

    /// The user aborted the interactive authorization flow.
    #[error("Authorization was cancelled")]
    AuthorizationCancelled,

    /// A termination request for a helper process failed.
    #[error("Termination failed: {0}")]
    Termination(String),

    /// Configuration operation failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
