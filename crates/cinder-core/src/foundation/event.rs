//! Normalized OneBot v11 events.
//!
//! Every inbound payload with a `post_type` becomes an [`Event`]. The event
//! keeps the category, bot id, timestamp and message as typed fields and the
//! remaining protocol fields in the original payload map, so that fields this
//! crate does not model are preserved and still reachable via [`Event::get`].
//!
//! The detail type lives under a key derived from the category
//! (`message_type`, `notice_type`, `request_type`, `meta_event_type`);
//! [`EventType::detail_type_key`] is the single place that mapping is made.
//!
//! # Example
//!
//! ```rust,ignore
//! use cinder_core::{Event, EventType};
//! use serde_json::json;
//!
//! let event = Event::from_payload(json!({
//!     "post_type": "message",
//!     "message_type": "group",
//!     "sub_type": "normal",
//!     "self_id": 10001,
//!     "time": 1700000000,
//!     "group_id": 123,
//!     "user_id": 456,
//!     "message": "hello"
//! }))?;
//!
//! assert_eq!(event.event_type(), EventType::Message);
//! assert_eq!(event.name(), "message.group.normal");
//! ```

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use super::error::{EventError, EventResult};
use super::message::Message;
use super::types::{Anonymous, Sender};

// ============================================================================
// Event Type Classification
// ============================================================================

/// The `post_type` category of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Message,
    Notice,
    Request,
    MetaEvent,
}

impl EventType {
    /// Returns the `post_type` string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Notice => "notice",
            Self::Request => "request",
            Self::MetaEvent => "meta_event",
        }
    }

    /// Returns the payload key holding the detail type for this category.
    pub fn detail_type_key(self) -> &'static str {
        match self {
            Self::Message => "message_type",
            Self::Notice => "notice_type",
            Self::Request => "request_type",
            Self::MetaEvent => "meta_event_type",
        }
    }
}

impl FromStr for EventType {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(Self::Message),
            "notice" => Ok(Self::Notice),
            "request" => Ok(Self::Request),
            "meta_event" => Ok(Self::MetaEvent),
            other => Err(EventError::UnknownType(other.to_string())),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an event: a message id, or the flag of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventId {
    Message(i64),
    Flag(String),
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(id) => write!(f, "{id}"),
            Self::Flag(flag) => f.write_str(flag),
        }
    }
}

// ============================================================================
// Event
// ============================================================================

const POST_TYPE: &str = "post_type";
const SELF_ID: &str = "self_id";
const TIME: &str = "time";
const MESSAGE: &str = "message";

/// A normalized inbound event.
///
/// Setters write through to the payload map, so [`Event::to_payload`] always
/// reflects the current state.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    event_type: EventType,
    self_id: String,
    time: i64,
    message: Option<Message>,
    /// Payload fields other than `message`, which is held in decoded form.
    raw: Map<String, Value>,
}

impl Event {
    /// Normalizes a raw payload.
    ///
    /// `post_type`, `self_id` and `time` are required. A `message` field in
    /// either string or array form is decoded into a [`Message`].
    pub fn from_payload(payload: Value) -> EventResult<Self> {
        let Value::Object(mut raw) = payload else {
            return Err(EventError::NotAnObject);
        };

        let event_type = match raw.get(POST_TYPE) {
            Some(Value::String(post_type)) => post_type.parse()?,
            Some(_) => return Err(EventError::InvalidField(POST_TYPE)),
            None => return Err(EventError::MissingField(POST_TYPE)),
        };
        let self_id = match raw.get(SELF_ID) {
            Some(Value::Number(id)) => id.to_string(),
            Some(Value::String(id)) => id.clone(),
            Some(_) => return Err(EventError::InvalidField(SELF_ID)),
            None => return Err(EventError::MissingField(SELF_ID)),
        };
        let time = raw
            .get(TIME)
            .ok_or(EventError::MissingField(TIME))?
            .as_i64()
            .ok_or(EventError::InvalidField(TIME))?;
        let message = match raw.remove(MESSAGE) {
            None | Some(Value::Null) => None,
            Some(Value::String(wire)) => Some(Message::parse(&wire)),
            Some(structured) => Some(Message::from_value(&structured)?),
        };

        Ok(Self {
            event_type,
            self_id,
            time,
            message,
            raw,
        })
    }

    /// Returns the payload with the current message written back in array form.
    pub fn to_payload(&self) -> Value {
        let mut raw = self.raw.clone();
        if let Some(message) = &self.message {
            raw.insert(
                MESSAGE.into(),
                serde_json::to_value(message).unwrap_or_default(),
            );
        }
        Value::Object(raw)
    }

    /// Reads any payload field other than `message`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        self.raw.get(key).and_then(Value::as_i64)
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(Value::as_str)
    }

    // ------------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------------

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Changes the category. The detail type is then read from the new
    /// category's key.
    pub fn set_event_type(&mut self, event_type: EventType) {
        self.event_type = event_type;
        self.raw
            .insert(POST_TYPE.into(), Value::from(event_type.as_str()));
    }

    /// Returns the detail type (`private`, `group`, `group_increase`, ...).
    pub fn detail_type(&self) -> Option<&str> {
        self.get_str(self.event_type.detail_type_key())
    }

    pub fn set_detail_type(&mut self, detail_type: impl Into<String>) {
        let key = self.event_type.detail_type_key();
        self.raw.insert(key.into(), Value::String(detail_type.into()));
    }

    pub fn sub_type(&self) -> Option<&str> {
        self.get_str("sub_type")
    }

    pub fn set_sub_type(&mut self, sub_type: impl Into<String>) {
        self.raw
            .insert("sub_type".into(), Value::String(sub_type.into()));
    }

    /// The receiving bot's id, as a string.
    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    pub fn set_self_id(&mut self, self_id: impl Into<String>) {
        let self_id = self_id.into();
        let value = self_id
            .parse::<i64>()
            .map_or_else(|_| Value::String(self_id.clone()), Value::from);
        self.raw.insert(SELF_ID.into(), value);
        self.self_id = self_id;
    }

    /// Unix timestamp in seconds.
    pub fn time(&self) -> i64 {
        self.time
    }

    pub fn set_time(&mut self, time: i64) {
        self.time = time;
        self.raw.insert(TIME.into(), Value::from(time));
    }

    /// `message_id` when present, otherwise the request `flag`.
    pub fn id(&self) -> Option<EventId> {
        self.get_i64("message_id").map(EventId::Message).or_else(|| {
            self.get_str("flag")
                .map(|flag| EventId::Flag(flag.to_string()))
        })
    }

    /// Dotted event name: `type.detail_type[.sub_type]`.
    pub fn name(&self) -> String {
        let mut name = self.event_type.as_str().to_string();
        for part in [self.detail_type(), self.sub_type()].into_iter().flatten() {
            if !part.is_empty() {
                name.push('.');
                name.push_str(part);
            }
        }
        name
    }

    // ------------------------------------------------------------------------
    // Targets
    // ------------------------------------------------------------------------

    pub fn user_id(&self) -> Option<i64> {
        self.get_i64("user_id")
    }

    pub fn set_user_id(&mut self, user_id: i64) {
        self.raw.insert("user_id".into(), Value::from(user_id));
    }

    pub fn group_id(&self) -> Option<i64> {
        self.get_i64("group_id")
    }

    pub fn set_group_id(&mut self, group_id: i64) {
        self.raw.insert("group_id".into(), Value::from(group_id));
    }

    /// Whether the message addresses the bot. Absent means `false`.
    pub fn to_me(&self) -> bool {
        self.raw
            .get("to_me")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn set_to_me(&mut self, to_me: bool) {
        self.raw.insert("to_me".into(), Value::Bool(to_me));
    }

    // ------------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------------

    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    pub fn message_mut(&mut self) -> Option<&mut Message> {
        self.message.as_mut()
    }

    pub fn set_message(&mut self, message: Message) {
        self.message = Some(message);
    }

    pub fn raw_message(&self) -> Option<&str> {
        self.get_str("raw_message")
    }

    pub fn set_raw_message(&mut self, raw_message: impl Into<String>) {
        self.raw
            .insert("raw_message".into(), Value::String(raw_message.into()));
    }

    /// Plain text of the message, if this event carries one.
    pub fn plain_text(&self) -> Option<String> {
        self.message.as_ref().map(Message::extract_plain_text)
    }

    /// The decoded `sender` object. Malformed senders read as `None`.
    pub fn sender(&self) -> Option<Sender> {
        self.raw
            .get("sender")
            .and_then(|sender| serde_json::from_value(sender.clone()).ok())
    }

    pub fn set_sender(&mut self, sender: &Sender) {
        self.raw.insert(
            "sender".into(),
            serde_json::to_value(sender).unwrap_or_default(),
        );
    }

    /// The anonymous identity of an anonymous group message.
    pub fn anonymous(&self) -> Option<Anonymous> {
        self.raw
            .get("anonymous")
            .and_then(|anonymous| serde_json::from_value(anonymous.clone()).ok())
    }
}

impl TryFrom<Value> for Event {
    type Error = EventError;

    fn try_from(payload: Value) -> EventResult<Self> {
        Self::from_payload(payload)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::Segment;
    use serde_json::json;

    fn group_message() -> Value {
        json!({
            "post_type": "message",
            "message_type": "group",
            "sub_type": "normal",
            "message_id": 42,
            "self_id": 10001,
            "time": 1700000000,
            "group_id": 123,
            "user_id": 456,
            "message": "hi [CQ:at,qq=10001]",
            "raw_message": "hi [CQ:at,qq=10001]",
            "sender": {"user_id": 456, "nickname": "alice", "card": "", "role": "member"}
        })
    }

    #[test]
    fn test_from_payload() {
        let event = Event::from_payload(group_message()).unwrap();
        assert_eq!(event.event_type(), EventType::Message);
        assert_eq!(event.detail_type(), Some("group"));
        assert_eq!(event.sub_type(), Some("normal"));
        assert_eq!(event.self_id(), "10001");
        assert_eq!(event.time(), 1700000000);
        assert_eq!(event.id(), Some(EventId::Message(42)));
        assert_eq!(event.user_id(), Some(456));
        assert_eq!(event.group_id(), Some(123));
        assert!(!event.to_me());
        assert_eq!(event.name(), "message.group.normal");
        assert_eq!(
            event.message(),
            Some(&(Segment::text("hi ") + Segment::at(10001)))
        );
        assert_eq!(event.plain_text().as_deref(), Some("hi "));
    }

    #[test]
    fn test_array_message() {
        let mut payload = group_message();
        payload["message"] = json!([{"type": "text", "data": {"text": "x"}}]);
        let event = Event::from_payload(payload).unwrap();
        assert_eq!(event.message(), Some(&Message::from(Segment::text("x"))));
    }

    #[test]
    fn test_rejects_invalid_payloads() {
        assert!(matches!(
            Event::from_payload(json!([])),
            Err(EventError::NotAnObject)
        ));
        assert!(matches!(
            Event::from_payload(json!({"self_id": 1, "time": 1})),
            Err(EventError::MissingField("post_type"))
        ));
        assert!(matches!(
            Event::from_payload(json!({"post_type": "unknown", "self_id": 1, "time": 1})),
            Err(EventError::UnknownType(_))
        ));
        assert!(matches!(
            Event::from_payload(json!({"post_type": "notice", "time": 1})),
            Err(EventError::MissingField("self_id"))
        ));
        assert!(matches!(
            Event::from_payload(
                json!({"post_type": "message", "self_id": 1, "time": 1, "message": 5})
            ),
            Err(EventError::Message(_))
        ));
    }

    #[test]
    fn test_detail_type_follows_event_type() {
        let mut event = Event::from_payload(json!({
            "post_type": "notice",
            "notice_type": "group_increase",
            "self_id": 1,
            "time": 1
        }))
        .unwrap();
        assert_eq!(event.detail_type(), Some("group_increase"));

        event.set_event_type(EventType::Request);
        assert_eq!(event.detail_type(), None);

        event.set_detail_type("friend");
        let payload = event.to_payload();
        assert_eq!(payload["post_type"], "request");
        assert_eq!(payload["request_type"], "friend");
        assert_eq!(payload["notice_type"], "group_increase");
    }

    #[test]
    fn test_setters_write_through() {
        let mut event = Event::from_payload(group_message()).unwrap();
        event.set_to_me(true);
        event.set_user_id(7);
        event.set_self_id("20002");
        event.set_message(Message::from(Segment::face(1)));

        let payload = event.to_payload();
        assert_eq!(payload["to_me"], true);
        assert_eq!(payload["user_id"], 7);
        assert_eq!(payload["self_id"], 20002);
        assert_eq!(payload["message"], json!([{"type": "face", "data": {"id": "1"}}]));
    }

    #[test]
    fn test_request_flag_id() {
        let event = Event::from_payload(json!({
            "post_type": "request",
            "request_type": "friend",
            "self_id": "1",
            "time": 1,
            "flag": "abc"
        }))
        .unwrap();
        assert_eq!(event.id(), Some(EventId::Flag("abc".into())));
        assert_eq!(event.name(), "request.friend");
        assert!(event.message().is_none());
    }

    #[test]
    fn test_sender() {
        let event = Event::from_payload(group_message()).unwrap();
        let sender = event.sender().unwrap();
        assert_eq!(sender.nickname.as_deref(), Some("alice"));
        assert_eq!(sender.display_name(), Some("alice"));
        assert!(event.anonymous().is_none());
    }
}
