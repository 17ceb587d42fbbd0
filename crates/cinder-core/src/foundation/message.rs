//! Messages as ordered segment sequences.
//!
//! A [`Message`] is the unit that flows in and out of the bot: an ordered
//! list of [`Segment`]s rendered in sequence. OneBot v11 delivers messages in
//! two shapes and both are accepted:
//!
//! - **Array form**: a JSON array of segment objects (or a single object)
//! - **String form**: wire text with embedded CQ codes
//!
//! Messages always serialize to the array form. [`Display`](std::fmt::Display)
//! renders the string form.
//!
//! # Example
//!
//! ```rust,ignore
//! use cinder_core::{Message, Segment};
//!
//! let mut message = Message::parse("hello [CQ:at,qq=10001000]");
//! message.push(Segment::face(14));
//!
//! assert_eq!(message.extract_plain_text(), "hello ");
//! assert_eq!(message.to_string(), "hello [CQ:at,qq=10001000][CQ:face,id=14]");
//! ```

use std::fmt;
use std::ops::{Add, AddAssign, Index, IndexMut, RangeBounds};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::codec;
use super::error::CodecError;
use super::segment::Segment;

/// An ordered sequence of message segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Message {
    segments: Vec<Segment>,
}

impl Message {
    /// Creates an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses wire text. See [`codec::parse`].
    pub fn parse(wire: &str) -> Self {
        codec::parse(wire)
    }

    /// Builds a message from the structured form. See [`codec::from_structured`].
    pub fn from_value(value: &Value) -> Result<Self, CodecError> {
        codec::from_structured(value)
    }

    /// Renders the message as wire text.
    pub fn to_wire(&self) -> String {
        codec::serialize(self)
    }

    /// Appends a segment.
    pub fn push(&mut self, segment: impl Into<Segment>) {
        self.segments.push(segment.into());
    }

    /// Appends every segment of another message.
    pub fn append(&mut self, other: Message) {
        self.segments.extend(other.segments);
    }

    pub fn insert(&mut self, index: usize, segment: Segment) {
        self.segments.insert(index, segment);
    }

    /// Removes and returns the segment at `index`, if any.
    pub fn remove(&mut self, index: usize) -> Option<Segment> {
        (index < self.segments.len()).then(|| self.segments.remove(index))
    }

    /// Removes a range of segments and returns them.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds, like [`Vec::drain`].
    pub fn remove_range<R>(&mut self, range: R) -> Vec<Segment>
    where
        R: RangeBounds<usize>,
    {
        self.segments.drain(range).collect()
    }

    /// Keeps the first `len` segments and drops the rest.
    pub fn truncate(&mut self, len: usize) {
        self.segments.truncate(len);
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn first(&self) -> Option<&Segment> {
        self.segments.first()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Concatenates the text of all `text` segments, skipping everything else.
    pub fn extract_plain_text(&self) -> String {
        self.segments.iter().filter_map(Segment::as_text).collect()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(wire) => Ok(Self::parse(&wire)),
            other => Self::from_value(&other).map_err(serde::de::Error::custom),
        }
    }
}

// ============================================================================
// Indexing & iteration
// ============================================================================

impl Index<usize> for Message {
    type Output = Segment;

    fn index(&self, index: usize) -> &Segment {
        &self.segments[index]
    }
}

impl IndexMut<usize> for Message {
    fn index_mut(&mut self, index: usize) -> &mut Segment {
        &mut self.segments[index]
    }
}

impl IntoIterator for Message {
    type Item = Segment;
    type IntoIter = std::vec::IntoIter<Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.into_iter()
    }
}

impl<'a> IntoIterator for &'a Message {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

impl FromIterator<Segment> for Message {
    fn from_iter<T: IntoIterator<Item = Segment>>(iter: T) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<Segment> for Message {
    fn from(segment: Segment) -> Self {
        Self {
            segments: vec![segment],
        }
    }
}

impl From<Vec<Segment>> for Message {
    fn from(segments: Vec<Segment>) -> Self {
        Self { segments }
    }
}

/// Wire text, CQ codes included.
impl From<&str> for Message {
    fn from(wire: &str) -> Self {
        Self::parse(wire)
    }
}

impl From<String> for Message {
    fn from(wire: String) -> Self {
        Self::parse(&wire)
    }
}

// ============================================================================
// Concatenation
// ============================================================================

impl<T: Into<Message>> Add<T> for Message {
    type Output = Message;

    fn add(mut self, rhs: T) -> Message {
        self.append(rhs.into());
        self
    }
}

impl<T: Into<Message>> AddAssign<T> for Message {
    fn add_assign(&mut self, rhs: T) {
        self.append(rhs.into());
    }
}

impl<T: Into<Message>> Add<T> for Segment {
    type Output = Message;

    fn add(self, rhs: T) -> Message {
        Message::from(self) + rhs
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_and_index() {
        let mut message = Message::new();
        message.push(Segment::text("a"));
        message.push(Segment::at(1));
        assert_eq!(message.len(), 2);
        assert_eq!(message[1], Segment::at(1));

        message[0] = Segment::text("b");
        assert_eq!(message.first(), Some(&Segment::text("b")));
    }

    #[test]
    fn test_removal() {
        let mut message: Message = (0..5).map(Segment::face).collect();

        assert_eq!(message.remove(0), Some(Segment::face(0)));
        assert_eq!(message.remove(10), None);

        let removed = message.remove_range(1..3);
        assert_eq!(removed, vec![Segment::face(2), Segment::face(3)]);
        assert_eq!(message.segments(), &[Segment::face(1), Segment::face(4)]);

        message.truncate(1);
        assert_eq!(message.len(), 1);
    }

    #[test]
    fn test_concatenation() {
        let message = Segment::text("hi ") + Segment::at(2) + "[CQ:face,id=1]";
        assert_eq!(message.len(), 3);
        assert_eq!(message[2], Segment::face(1));

        let mut other = Message::from(Segment::dice());
        other += message.clone();
        assert_eq!(other.len(), 4);
        assert_eq!(other.last(), Some(&Segment::face(1)));
    }

    #[test]
    fn test_extract_plain_text() {
        let message = Message::parse("a[CQ:at,qq=1]b [CQ:image,file=x]c");
        assert_eq!(message.extract_plain_text(), "ab c");
    }

    #[test]
    fn test_display_is_wire_form() {
        let message = Segment::text("x&y") + Segment::reply(3);
        assert_eq!(message.to_string(), "x&amp;y[CQ:reply,id=3]");
    }

    #[test]
    fn test_deserialize_accepts_both_forms() {
        let from_string: Message = serde_json::from_value(json!("hi[CQ:at,qq=5]")).unwrap();
        let from_array: Message = serde_json::from_value(json!([
            {"type": "text", "data": {"text": "hi"}},
            {"type": "at", "data": {"qq": "5"}}
        ]))
        .unwrap();
        assert_eq!(from_string, from_array);
    }

    #[test]
    fn test_serialize_as_array() {
        let message = Segment::text("hi") + Segment::at(5);
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!([
                {"type": "text", "data": {"text": "hi"}},
                {"type": "at", "data": {"qq": "5"}}
            ])
        );
    }
}
