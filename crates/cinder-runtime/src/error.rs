//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use crate::logging::LoggingError;

/// Errors that can occur while building or running the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Logging could not be installed.
    #[error(transparent)]
    Logging(#[from] LoggingError),

    /// A configured nickname does not compile into a pattern.
    #[error("Invalid nickname pattern: {0}")]
    Nickname(#[from] regex::Error),

    /// Registering a shutdown signal handler failed.
    #[error("Failed to listen for shutdown signals: {0}")]
    Signal(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
