//! Message segments.
//!
//! A [`Segment`] is one typed unit of a rich message: a piece of text, a
//! mention, an image and so on. Segments carry a type name and an ordered
//! map of parameters, mirroring the OneBot v11 array format:
//!
//! ```json
//! {"type": "at", "data": {"qq": "10001000"}}
//! ```
//!
//! Segments are immutable once built. Use the named constructors for the
//! standard OneBot v11 types and [`Segment::with`] to attach optional
//! parameters:
//!
//! ```rust,ignore
//! use cinder_core::Segment;
//!
//! let image = Segment::image("https://example.com/a.png").with("cache", false);
//! let mention = Segment::at(10001000);
//! ```

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::codec;
use super::message::Message;

// ============================================================================
// SegmentValue
// ============================================================================

/// A parameter value inside a segment's data map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SegmentValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Nested content, used by custom forward nodes.
    Message(Message),
}

impl SegmentValue {
    /// Returns the string if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for SegmentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => f.write_str(value),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Message(message) => write!(f, "{message}"),
        }
    }
}

impl From<&str> for SegmentValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for SegmentValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for SegmentValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for SegmentValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for SegmentValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for SegmentValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Message> for SegmentValue {
    fn from(value: Message) -> Self {
        Self::Message(value)
    }
}

// ============================================================================
// Segment
// ============================================================================

/// A single OneBot v11 message segment.
///
/// Equality is structural over the type name and the data map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    #[serde(rename = "type")]
    kind: String,
    data: IndexMap<String, SegmentValue>,
}

impl Segment {
    /// Creates a segment with no parameters.
    pub fn new(kind: impl Into<String>) -> Self {
        Self::with_data(kind, IndexMap::new())
    }

    /// Creates a segment from a type name and a prepared data map.
    pub fn with_data(kind: impl Into<String>, data: IndexMap<String, SegmentValue>) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// Returns a copy of this segment with `key` set to `value`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<SegmentValue>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Sets `key` only when a value is given.
    #[must_use]
    pub fn with_opt<V: Into<SegmentValue>>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    /// Returns the segment type name (e.g. `"text"`, `"at"`).
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the parameter map.
    pub fn data(&self) -> &IndexMap<String, SegmentValue> {
        &self.data
    }

    /// Returns a single parameter.
    pub fn get(&self, key: &str) -> Option<&SegmentValue> {
        self.data.get(key)
    }

    /// Returns true for `text` segments.
    pub fn is_text(&self) -> bool {
        self.kind == "text"
    }

    /// Returns the text of a `text` segment.
    pub fn as_text(&self) -> Option<&str> {
        if self.is_text() {
            self.get("text").and_then(SegmentValue::as_str)
        } else {
            None
        }
    }

    /// Renders the segment in CQ code form.
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        codec::render_segment(self, &mut out);
        out
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl<'de> Deserialize<'de> for Segment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if !value.is_object() {
            return Err(serde::de::Error::custom("expected a segment object"));
        }
        codec::from_structured(&value)
            .map_err(serde::de::Error::custom)?
            .into_iter()
            .next()
            .ok_or_else(|| serde::de::Error::custom("expected a segment object"))
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl Segment {
    /// Plain text. The text is stored as given, unescaped.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new("text").with("text", text.into())
    }

    /// Mentions a user.
    pub fn at(user_id: impl fmt::Display) -> Self {
        Self::new("at").with("qq", user_id.to_string())
    }

    /// Mentions everyone in a group.
    pub fn at_all() -> Self {
        Self::new("at").with("qq", "all")
    }

    /// A built-in QQ face.
    pub fn face(id: i32) -> Self {
        Self::new("face").with("id", id.to_string())
    }

    /// An image by file name, URL or base64 URI.
    pub fn image(file: impl Into<String>) -> Self {
        Self::new("image").with("file", file.into())
    }

    /// A voice record.
    pub fn record(file: impl Into<String>) -> Self {
        Self::new("record").with("file", file.into())
    }

    /// A short video.
    pub fn video(file: impl Into<String>) -> Self {
        Self::new("video").with("file", file.into())
    }

    /// Quotes an earlier message.
    pub fn reply(message_id: i64) -> Self {
        Self::new("reply").with("id", message_id.to_string())
    }

    pub fn poke(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new("poke").with("type", kind.into()).with("id", id.into())
    }

    /// A link share card.
    pub fn share(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new("share")
            .with("url", url.into())
            .with("title", title.into())
    }

    pub fn location(latitude: f64, longitude: f64) -> Self {
        Self::new("location")
            .with("lat", latitude.to_string())
            .with("lon", longitude.to_string())
    }

    /// A music share from a platform (`qq`, `163`, `xm`).
    pub fn music(platform: impl Into<String>, id: i64) -> Self {
        Self::new("music").with("type", platform.into()).with("id", id)
    }

    /// A custom music share.
    pub fn music_custom(
        url: impl Into<String>,
        audio: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self::new("music")
            .with("type", "custom")
            .with("url", url.into())
            .with("audio", audio.into())
            .with("title", title.into())
    }

    /// Recommends a friend.
    pub fn contact_user(user_id: i64) -> Self {
        Self::new("contact")
            .with("type", "qq")
            .with("id", user_id.to_string())
    }

    /// Recommends a group.
    pub fn contact_group(group_id: i64) -> Self {
        Self::new("contact")
            .with("type", "group")
            .with("id", group_id.to_string())
    }

    pub fn dice() -> Self {
        Self::new("dice")
    }

    pub fn rps() -> Self {
        Self::new("rps")
    }

    pub fn shake() -> Self {
        Self::new("shake")
    }

    /// Sends the containing group message anonymously.
    pub fn anonymous(ignore_failure: Option<bool>) -> Self {
        Self::new("anonymous").with_opt("ignore", ignore_failure)
    }

    /// A forwarded message reference. Only ever received.
    pub fn forward(id: impl Into<String>) -> Self {
        Self::new("forward").with("id", id.into())
    }

    /// A forward node referring to an existing message.
    pub fn node(message_id: i64) -> Self {
        Self::new("node").with("id", message_id.to_string())
    }

    /// A forward node with inline content.
    pub fn node_custom(
        user_id: i64,
        nickname: impl Into<String>,
        content: impl Into<Message>,
    ) -> Self {
        Self::new("node")
            .with("user_id", user_id.to_string())
            .with("nickname", nickname.into())
            .with("content", content.into())
    }

    pub fn xml(data: impl Into<String>) -> Self {
        Self::new("xml").with("data", data.into())
    }

    pub fn json(data: impl Into<String>) -> Self {
        Self::new("json").with("data", data.into())
    }
}

// ============================================================================
// Tests
// ============================================================================
