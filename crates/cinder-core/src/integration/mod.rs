//! Integration layer - the interface protocol adapters implement.

pub mod bot;

pub use bot::{ApiError, ApiResult, Bot, BoxedBot};
