//! CQ code wire format.
//!
//! OneBot v11 transmits rich messages either as an array of segment objects or
//! as a flat string in which non-text segments are embedded as CQ codes:
//!
//! ```text
//! hello [CQ:at,qq=10001000] see [CQ:image,file=a.png,cache=0]
//! ```
//!
//! Plain text around the codes is escaped so that `&`, `[` and `]` never
//! appear bare; parameter values additionally escape `,`.
//!
//! This module contains the string-level pieces: [`escape`], [`unescape`],
//! [`parse`], [`serialize`] and [`from_structured`]. The [`Message`] and
//! [`Segment`] types expose the same operations as methods.

use indexmap::IndexMap;
use serde_json::Value;

use super::error::CodecError;
use super::message::Message;
use super::segment::{Segment, SegmentValue};

const CODE_OPEN: &str = "[CQ:";

// ============================================================================
// Escaping
// ============================================================================

/// Escapes CQ control characters.
///
/// `&` → `&amp;`, `[` → `&#91;`, `]` → `&#93;` and, when `escape_comma` is
/// set, `,` → `&#44;`. Text segments are escaped without commas, parameter
/// values with them.
pub fn escape(text: &str, escape_comma: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '[' => escaped.push_str("&#91;"),
            ']' => escaped.push_str("&#93;"),
            ',' if escape_comma => escaped.push_str("&#44;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Reverses [`escape`].
///
/// `&amp;` is replaced last so that entities produced by escaping a literal
/// `&` are not decoded twice.
pub fn unescape(text: &str) -> String {
    text.replace("&#44;", ",")
        .replace("&#91;", "[")
        .replace("&#93;", "]")
        .replace("&amp;", "&")
}

// ============================================================================
// Parsing
// ============================================================================

/// A lexical unit of wire text.
#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    /// Escaped text between codes, possibly empty.
    Text(&'a str),
    /// A CQ code; `params` still carries its leading comma.
    Code { kind: &'a str, params: &'a str },
}

fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.')
}

/// Matches a single code whose `[CQ:` prefix starts at `start`.
///
/// Returns the segment type, the raw parameter string and the byte offset
/// just past the closing bracket. Values run up to the next `,` or `]`, and a
/// single trailing comma before `]` is tolerated.
fn match_code(input: &str, start: usize) -> Option<(&str, &str, usize)> {
    let bytes = input.as_bytes();
    let kind_start = start + CODE_OPEN.len();

    let mut pos = kind_start;
    while bytes.get(pos).copied().is_some_and(is_name_byte) {
        pos += 1;
    }
    if pos == kind_start {
        return None;
    }
    let kind = &input[kind_start..pos];
    let params_start = pos;

    loop {
        match *bytes.get(pos)? {
            b']' => return Some((kind, &input[params_start..pos], pos + 1)),
            b',' => {
                let key_start = pos + 1;
                let mut cursor = key_start;
                while bytes.get(cursor).copied().is_some_and(is_name_byte) {
                    cursor += 1;
                }
                if cursor == key_start {
                    return (bytes.get(cursor) == Some(&b']'))
                        .then(|| (kind, &input[params_start..pos], cursor + 1));
                }
                while bytes.get(cursor).is_some_and(|&b| !matches!(b, b',' | b']')) {
                    cursor += 1;
                }
                pos = cursor;
            }
            _ => return None,
        }
    }
}

fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut search_from = 0;

    while let Some(offset) = input[search_from..].find(CODE_OPEN) {
        let start = search_from + offset;
        match match_code(input, start) {
            Some((kind, params, end)) => {
                tokens.push(Token::Text(&input[text_start..start]));
                tokens.push(Token::Code { kind, params });
                text_start = end;
                search_from = end;
            }
            // Not a well-formed code; the bracket stays part of the text.
            None => search_from = start + 1,
        }
    }
    tokens.push(Token::Text(&input[text_start..]));
    tokens
}

/// Splits a raw parameter string into segment data.
///
/// Each comma-separated entry is split on its first `=`; an entry without
/// `=` becomes a key with an empty value. Values are kept verbatim.
fn parse_params(params: &str) -> IndexMap<String, SegmentValue> {
    params
        .split(',')
        .map(str::trim_start)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (key, value) = entry.split_once('=').unwrap_or((entry, ""));
            (key.to_string(), SegmentValue::from(value))
        })
        .collect()
}

/// Parses wire text into a [`Message`].
///
/// Text between codes is unescaped and empty text is dropped. Parameter
/// values of non-text segments are not unescaped.
pub fn parse(wire: &str) -> Message {
    tokenize(wire)
        .into_iter()
        .filter_map(|token| match token {
            Token::Text("") => None,
            Token::Text(raw) => Some(Segment::text(unescape(raw))),
            Token::Code { kind, params } => Some(Segment::with_data(kind, parse_params(params))),
        })
        .collect()
}

// ============================================================================
// Rendering
// ============================================================================

/// Renders a single segment as wire text.
pub(crate) fn render_segment(segment: &Segment, out: &mut String) {
    if segment.is_text() {
        out.push_str(&escape(segment.as_text().unwrap_or_default(), false));
        return;
    }

    out.push_str(CODE_OPEN);
    out.push_str(segment.kind());
    for (key, value) in segment.data() {
        out.push(',');
        out.push_str(key);
        out.push('=');
        out.push_str(&escape(&value.to_string(), true));
    }
    out.push(']');
}

/// Renders a [`Message`] as wire text.
pub fn serialize(message: &Message) -> String {
    let mut out = String::new();
    for segment in message.iter() {
        render_segment(segment, &mut out);
    }
    out
}

// ============================================================================
// Structured input
// ============================================================================

/// Builds a [`Message`] from the structured (array) form.
///
/// Accepts a single segment object `{"type": ..., "data": {...}}` or an
/// array of them. `null` data values are skipped; nested arrays and objects
/// become nested messages.
pub fn from_structured(value: &Value) -> Result<Message, CodecError> {
    match value {
        Value::Object(_) => segment_from_value(value).map(Message::from),
        Value::Array(items) => items.iter().map(segment_from_value).collect(),
        other => Err(CodecError::UnexpectedShape(json_kind(other))),
    }
}

fn segment_from_value(value: &Value) -> Result<Segment, CodecError> {
    let object = value
        .as_object()
        .ok_or_else(|| CodecError::UnexpectedShape(json_kind(value)))?;
    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(CodecError::MissingType)?;

    let mut data = IndexMap::new();
    match object.get("data") {
        None | Some(Value::Null) => {}
        Some(Value::Object(fields)) => {
            for (key, field) in fields {
                if let Some(value) = segment_value_from_json(field)? {
                    data.insert(key.clone(), value);
                }
            }
        }
        Some(_) => {
            return Err(CodecError::InvalidData {
                kind: kind.to_string(),
            });
        }
    }
    Ok(Segment::with_data(kind, data))
}

fn segment_value_from_json(value: &Value) -> Result<Option<SegmentValue>, CodecError> {
    let converted = match value {
        Value::Null => return Ok(None),
        Value::Bool(flag) => SegmentValue::Bool(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(int) => SegmentValue::Int(int),
            None => SegmentValue::Float(number.as_f64().unwrap_or_default()),
        },
        Value::String(text) => SegmentValue::Str(text.clone()),
        Value::Array(_) | Value::Object(_) => SegmentValue::Message(from_structured(value)?),
    };
    Ok(Some(converted))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Tests
// ============================================================================
