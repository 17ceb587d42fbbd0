//! Data models for the OneBot v11 protocol.

pub mod api;

pub use api::*;
