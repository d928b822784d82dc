//! Common error types for the mentor services

use thiserror::Error;

/// Common result type for mentor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised outside the request path (startup, configuration, helpers)
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input value
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
