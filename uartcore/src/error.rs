/*!
Common error types for the line framing engines.
*/

use thiserror::Error;

/// Common result type used throughout the engine library
pub type Result<T> = std::result::Result<T, UartError>;

/// Error type covering all engine-library operations
#[derive(Error, Debug)]
pub enum UartError {
    /// Frame configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Generic errors with context
    #[error("error: {0}")]
    Generic(String),
}

impl UartError {
    /// Create a new generic error with a message
    pub fn new(msg: impl Into<String>) -> Self {
        Self::Generic(msg.into())
    }
}
