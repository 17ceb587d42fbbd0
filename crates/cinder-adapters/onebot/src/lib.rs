//! # Cinder Adapter for OneBot v11
//!
//! Connects the Cinder dispatcher to OneBot v11 (CQHTTP) implementations.
//!
//! ## Overview
//!
//! - [`OneBotAdapter`]: the receive path. Tells events from API responses,
//!   marks messages addressed to the bot and dispatches events.
//! - [`OneBotBot`]: the [`Bot`](cinder_core::Bot) implementation with typed
//!   wrappers for the v11 actions.
//! - [`ResultStore`]: correlates WebSocket API calls with their responses.
//! - [`WsApiCaller`] / [`HttpApiCaller`]: the two ways an API call travels.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cinder_adapter_onebot::{OneBotAdapter, OneBotConfig};
//!
//! let adapter = Arc::new(OneBotAdapter::new(OneBotConfig::default(), dispatcher));
//! let bot = adapter.connect_websocket("10001", outbound_tx);
//!
//! while let Some(frame) = inbound.recv().await {
//!     adapter.handle_text("10001", &frame).await;
//! }
//! ```

pub mod adapter;
pub mod api_caller;
pub mod bot;
pub mod config;
pub mod detect;
pub mod model;
pub mod result_store;

pub use adapter::OneBotAdapter;
pub use api_caller::{ApiCaller, HttpApiCaller, WsApiCaller, handle_api_result};
pub use bot::OneBotBot;
pub use config::OneBotConfig;
pub use detect::{NicknameMatcher, check_at_me};
pub use model::api::*;
pub use result_store::{PendingCall, ResultStore};
