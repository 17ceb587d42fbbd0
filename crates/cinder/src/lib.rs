//! # Cinder
//!
//! An event-dispatch bot framework for OneBot v11 (CQHTTP).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────────┐     ┌────────────┐     ┌───────────────────────┐
//! │  Transport   │────▶│  OneBotAdapter  │────▶│ Dispatcher │────▶│ priority 1: matchers  │
//! │ (ws / http)  │◀────│ (results, to_me)│     │            │────▶│ priority 5: matchers  │
//! └──────────────┘     └─────────────────┘     └────────────┘     └───────────────────────┘
//! ```
//!
//! - **Adapter**: tells events from API responses, marks messages addressed
//!   to the bot and hands events to the dispatcher
//! - **Dispatcher**: runs preprocessors, then matchers tier by tier in
//!   ascending priority; a blocking matcher that runs stops lower tiers
//! - **Matchers**: event type, permissions and rules decide whether the
//!   handlers run
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cinder::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = CinderRuntime::builder().build()?;
//!
//!     runtime.register_matcher(
//!         on_message()
//!             .rule(rule::to_me())
//!             .block(true)
//!             .handler(|bot, event, _state| async move {
//!                 if let Some(message) = event.message() {
//!                     bot.send(&event, message.clone(), true).await?;
//!                 }
//!                 Ok(())
//!             }),
//!     );
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: load `cinder.toml`
//! - `yaml-config`: load `cinder.yaml`
//! - `json-log`: JSON log output

pub use cinder_adapter_onebot as onebot;
pub use cinder_core as core;
pub use cinder_framework as framework;
pub use cinder_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use cinder::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use cinder_runtime::{CinderConfig, CinderRuntime};

    // Matchers and their building blocks
    pub use cinder_framework::{
        DispatchOutcome, Matcher, PREFIX_KEY, Preprocess, Preprocessor, State, on_command,
        on_message, on_meta_event, on_notice, on_request, permission, rule,
    };

    // Messages and events
    pub use cinder_core::{Event, EventType, Message, Segment};

    // Bot types - for interacting with bots in handlers
    pub use cinder_core::{ApiError, ApiResult, Bot, BoxedBot};
    pub use cinder_adapter_onebot::OneBotBot;
}
