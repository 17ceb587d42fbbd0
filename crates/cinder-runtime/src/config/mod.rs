//! Configuration module for the Cinder runtime.
//!
//! This module provides figment-based configuration loading and validation
//! for logging, message detection and the OneBot adapter.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, load_config, load_config_from_file};
pub use schema::{
    CinderConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, SpanEventConfig,
};
pub use validation::validate_config;
