//! Foundation layer - the message and event model.
//!
//! - Wire codec for CQ-coded text ([`codec`])
//! - Segments and messages ([`Segment`], [`Message`])
//! - Normalized events ([`Event`])

pub mod codec;
pub mod error;
pub mod event;
pub mod message;
pub mod segment;
pub mod types;

pub use error::{CodecError, EventError, EventResult};
pub use event::{Event, EventId, EventType};
pub use message::Message;
pub use segment::{Segment, SegmentValue};
pub use types::{Anonymous, Sender};
