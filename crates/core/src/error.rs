//! Shared error types

use thiserror::Error;

/// Errors raised outside any specific subsystem: process setup,
/// runtime configuration and filesystem plumbing.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid or missing runtime configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("Core error: {0}")]
    Generic(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
