//! Error types for the Turnstile library.

use thiserror::Error;

/// Main error type for Turnstile operations.
#[derive(Error, Debug)]
pub enum TurnstileError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bucket store transport or protocol errors
    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    /// A store round-trip exceeded the configured latency bound
    #[error("Store operation timed out")]
    StoreTimeout,

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Turnstile operations.
pub type Result<T> = std::result::Result<T, TurnstileError>;
