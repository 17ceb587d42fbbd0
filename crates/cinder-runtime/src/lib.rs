//! Cinder Runtime - Configuration, logging and wiring for the Cinder bot framework.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`, `CinderConfig`)
//! - Logging setup (`LoggingBuilder`)
//! - Runtime wiring (`CinderRuntime`): the matcher and preprocessor
//!   registries, the command table and the OneBot adapter
//!
//! ```ignore
//! use cinder_runtime::CinderRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = CinderRuntime::builder().build()?;
//!     runtime.register_matcher(runtime.on_command("ping").handler(|bot, event, _| async move {
//!         bot.send(&event, "pong".into(), false).await?;
//!         Ok(())
//!     }));
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{CinderConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, LoggingError, SpanEvents};
pub use runtime::{CinderRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
