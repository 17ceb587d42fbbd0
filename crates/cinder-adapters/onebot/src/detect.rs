//! Detection of messages addressed to the bot.
//!
//! Both checks only touch message events and run before dispatch:
//!
//! 1. [`check_at_me`]: private messages are always addressed to the bot. In
//!    groups, a mention of the bot at the start or the end of the message
//!    marks it and is stripped from the message.
//! 2. [`NicknameMatcher::check`]: a message starting with one of the bot's
//!    nicknames marks it, and the nickname is stripped.

use regex::Regex;
use tracing::debug;

use cinder_core::{Event, EventType, Message, Segment};

/// Whole-segment comparison against `at(self_id)`. Only the type of `qq` is
/// normalized; extra data keys make it a different segment.
fn is_at_self(segment: &Segment, self_id: &str) -> bool {
    segment.kind() == "at"
        && segment.data().len() == 1
        && segment
            .get("qq")
            .is_some_and(|target| target.to_string() == self_id)
}

fn is_blank_text(segment: &Segment) -> bool {
    segment.as_text().is_some_and(|text| text.trim().is_empty())
}

/// Sets `to_me` on message events and strips the mention of the bot.
///
/// A single trailing whitespace-only text segment is skipped when looking for
/// a trailing mention, as long as something precedes it. A message left
/// empty gets one empty text segment.
pub fn check_at_me(event: &mut Event) {
    if event.event_type() != EventType::Message {
        return;
    }
    if event.detail_type() == Some("private") {
        event.set_to_me(true);
        return;
    }

    let self_id = event.self_id().to_string();
    let mut to_me = false;
    if let Some(message) = event.message_mut() {
        to_me = strip_at_self(message, &self_id);
        if message.is_empty() {
            message.push(Segment::text(""));
        }
    }
    event.set_to_me(to_me);
}

/// Removes a leading or trailing mention of `self_id`. Returns true if one
/// was found.
fn strip_at_self(message: &mut Message, self_id: &str) -> bool {
    if message.first().is_some_and(|first| is_at_self(first, self_id)) {
        message.remove(0);
        return true;
    }
    if message.is_empty() {
        return false;
    }

    let mut index = message.len() - 1;
    if message.len() >= 2 && is_blank_text(&message[index]) {
        index -= 1;
    }
    if is_at_self(&message[index], self_id) {
        message.remove_range(index..);
        return true;
    }
    false
}

/// Recognises the bot's nicknames at the start of a message.
#[derive(Debug, Clone)]
pub struct NicknameMatcher {
    pattern: Option<Regex>,
}

impl NicknameMatcher {
    /// Builds the matcher. Empty nicknames are ignored; with none left, the
    /// matcher never matches.
    ///
    /// Nicknames are matched literally and case-insensitively.
    pub fn new<I, S>(nicknames: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternatives: Vec<String> = nicknames
            .into_iter()
            .filter(|nickname| !nickname.as_ref().is_empty())
            .map(|nickname| regex::escape(nickname.as_ref()))
            .collect();
        if alternatives.is_empty() {
            return Ok(Self { pattern: None });
        }

        let pattern = Regex::new(&format!(r"(?i)^({})([\s,，]*|$)", alternatives.join("|")))?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    /// A matcher without nicknames.
    pub fn disabled() -> Self {
        Self { pattern: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.pattern.is_some()
    }

    /// Sets `to_me` and strips the nickname when the first text segment
    /// starts with one. Returns true on a match.
    pub fn check(&self, event: &mut Event) -> bool {
        let Some(pattern) = &self.pattern else {
            return false;
        };
        if event.event_type() != EventType::Message {
            return false;
        }
        let Some(message) = event.message_mut() else {
            return false;
        };
        let Some(text) = message.first().and_then(Segment::as_text) else {
            return false;
        };
        let Some(captures) = pattern.captures(text) else {
            return false;
        };

        let (Some(whole), Some(nickname)) = (captures.get(0), captures.get(1)) else {
            return false;
        };
        debug!(nickname = nickname.as_str(), "User is calling me");
        let rest = text[whole.end()..].to_string();
        message[0] = Segment::text(rest);
        event.set_to_me(true);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn message_event(message_type: &str, message: Value) -> Event {
        let mut payload = json!({
            "post_type": "message",
            "message_type": message_type,
            "sub_type": "normal",
            "message_id": 1,
            "self_id": 10001,
            "time": 1700000000,
            "user_id": 456,
            "message": message,
        });
        if message_type == "group" {
            payload["group_id"] = json!(123);
        }
        Event::from_payload(payload).unwrap()
    }

    fn wire(event: &Event) -> String {
        event.message().unwrap().to_string()
    }

    #[test]
    fn test_private_is_always_to_me() {
        let mut event = message_event("private", json!("hello"));
        check_at_me(&mut event);
        assert!(event.to_me());
        assert_eq!(wire(&event), "hello");
    }

    #[test]
    fn test_leading_mention() {
        let mut event = message_event("group", json!("[CQ:at,qq=10001] hello"));
        check_at_me(&mut event);
        assert!(event.to_me());
        assert_eq!(wire(&event), " hello");
    }

    #[test]
    fn test_trailing_mention_with_blank_text() {
        let mut event = message_event("group", json!("hello [CQ:at,qq=10001] "));
        check_at_me(&mut event);
        assert!(event.to_me());
        assert_eq!(wire(&event), "hello ");
    }

    #[test]
    fn test_only_mention_leaves_empty_text() {
        let mut event = message_event(
            "group",
            json!([
                {"type": "at", "data": {"qq": "10001"}},
                {"type": "text", "data": {"text": ""}}
            ]),
        );
        check_at_me(&mut event);
        assert!(event.to_me());
        assert_eq!(event.message().unwrap().segments(), &[Segment::text("")]);
    }

    #[test]
    fn test_mention_of_someone_else() {
        let mut event = message_event("group", json!("[CQ:at,qq=20002] hello [CQ:at,qq=30003]"));
        check_at_me(&mut event);
        assert!(!event.to_me());
        assert_eq!(event.message().unwrap().len(), 3);
    }

    #[test]
    fn test_lone_blank_segment_is_not_a_mention() {
        let mut event = message_event("group", json!([{"type": "text", "data": {"text": "  "}}]));
        check_at_me(&mut event);
        assert!(!event.to_me());
        assert_eq!(event.message().unwrap().segments(), &[Segment::text("  ")]);
    }

    #[test]
    fn test_numeric_mention_target() {
        let mut event = message_event("group", json!([{"type": "at", "data": {"qq": 10001}}]));
        check_at_me(&mut event);
        assert!(event.to_me());
        assert_eq!(event.message().unwrap().segments(), &[Segment::text("")]);
    }

    #[test]
    fn test_mention_with_extra_data_is_not_self() {
        let mut event = message_event(
            "group",
            json!([
                {"type": "at", "data": {"qq": "10001", "name": "cinder"}},
                {"type": "text", "data": {"text": " hello"}}
            ]),
        );
        check_at_me(&mut event);
        assert!(!event.to_me());
        assert_eq!(event.message().unwrap().len(), 2);
    }

    #[test]
    fn test_nickname_is_stripped() {
        let matcher = NicknameMatcher::new(["bot", "机器人", ""]).unwrap();

        let mut event = message_event("group", json!("bot, hello"));
        assert!(matcher.check(&mut event));
        assert!(event.to_me());
        assert_eq!(wire(&event), "hello");

        let mut event = message_event("group", json!("机器人，在吗"));
        assert!(matcher.check(&mut event));
        assert_eq!(wire(&event), "在吗");

        let mut event = message_event("group", json!("BOT"));
        assert!(matcher.check(&mut event));
        assert_eq!(event.message().unwrap()[0].as_text(), Some(""));
    }

    #[test]
    fn test_nickname_is_anchored() {
        let matcher = NicknameMatcher::new(["bot"]).unwrap();
        let mut event = message_event("group", json!("hello bot"));
        assert!(!matcher.check(&mut event));
        assert!(!event.to_me());
        assert_eq!(wire(&event), "hello bot");
    }

    #[test]
    fn test_nickname_is_literal() {
        let matcher = NicknameMatcher::new(["b.t"]).unwrap();
        assert!(!matcher.check(&mut message_event("group", json!("bot hi"))));
        assert!(matcher.check(&mut message_event("group", json!("b.t hi"))));
    }

    #[test]
    fn test_no_nicknames() {
        let matcher = NicknameMatcher::new(["", ""]).unwrap();
        assert!(!matcher.is_enabled());
        assert!(!matcher.check(&mut message_event("group", json!("bot hi"))));
    }

    #[test]
    fn test_nickname_needs_leading_text() {
        let matcher = NicknameMatcher::new(["bot"]).unwrap();
        let mut event = message_event("group", json!("[CQ:face,id=1]bot hi"));
        assert!(!matcher.check(&mut event));
    }
}
