//! # Cinder Core
//!
//! The message and event model of the Cinder bot framework.
//!
//! Cinder speaks OneBot v11 (CQHTTP). This crate holds the pieces every other
//! crate builds on:
//!
//! ## Foundation Layer
//!
//! - **Codec**: escaping, parsing and rendering of CQ-coded wire text ([`codec`])
//! - **Messages**: ordered segment sequences ([`Message`], [`Segment`])
//! - **Events**: normalized inbound payloads with typed accessors ([`Event`])
//!
//! ## Integration Layer
//!
//! - **Bot**: the handle handlers use to call actions and reply ([`Bot`])
//! - **Errors**: the API error taxonomy ([`ApiError`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use cinder_core::{Message, Segment};
//!
//! let message = Message::parse("[CQ:at,qq=10001] hello &#91;world&#93;");
//! assert_eq!(message[0], Segment::at(10001));
//! assert_eq!(message.extract_plain_text(), " hello [world]");
//!
//! let reply = Segment::reply(42) + Segment::text("pong");
//! assert_eq!(reply.to_string(), "[CQ:reply,id=42]pong");
//! ```

pub mod foundation;
pub mod integration;

pub use foundation::codec;
pub use foundation::{
    Anonymous, CodecError, Event, EventError, EventId, EventResult, EventType, Message, Segment,
    SegmentValue, Sender,
};
pub use integration::{ApiError, ApiResult, Bot, BoxedBot};

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::{Event, EventType, Message, Segment};
    pub use super::integration::{ApiError, ApiResult, Bot, BoxedBot};
}
