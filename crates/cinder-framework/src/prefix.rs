//! Command-prefix seeding.
//!
//! Before any matcher runs, the dispatcher asks a [`PrefixMatcher`] to look
//! at the event once and record what it finds in the dispatch state. The
//! result is advisory: it never stops an event, it only gives rules such as
//! [`rule::command`](crate::rule::command) something to compare against.

use std::collections::BTreeSet;
use std::fmt;

use parking_lot::RwLock;
use serde_json::{Value, json};

use crate::state::{PREFIX_KEY, State};
use cinder_core::{BoxedBot, Event};

/// Seeds the dispatch state from the start of a message.
///
/// Returns the raw matched prefix and the command it names, or `None` for
/// either when nothing matched.
pub trait PrefixMatcher: Send + Sync {
    fn seed(
        &self,
        bot: &BoxedBot,
        event: &Event,
        state: &mut State,
    ) -> (Option<String>, Option<String>);
}

/// A table of registered commands recognised after a command start.
///
/// For `starts = ["/", "!"]` and the command `echo`, the text `"/echo hi"`
/// seeds `{"raw_command": "/echo", "command": "echo"}`. When several
/// commands match, the longest raw prefix wins.
pub struct CommandTable {
    starts: Vec<String>,
    commands: RwLock<BTreeSet<String>>,
}

impl CommandTable {
    /// Creates a table. An empty list of starts means commands need no
    /// leading marker.
    pub fn new<I, S>(starts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut starts: Vec<String> = starts.into_iter().map(Into::into).collect();
        if starts.is_empty() {
            starts.push(String::new());
        }
        Self {
            starts,
            commands: RwLock::new(BTreeSet::new()),
        }
    }

    /// Registers a command name. Returns false if it was already known.
    pub fn register(&self, command: impl Into<String>) -> bool {
        self.commands.write().insert(command.into())
    }

    pub fn contains(&self, command: &str) -> bool {
        self.commands.read().contains(command)
    }

    pub fn starts(&self) -> &[String] {
        &self.starts
    }

    /// Finds the longest `start + command` prefix of `text`.
    fn longest_match(&self, text: &str) -> Option<(String, String)> {
        let commands = self.commands.read();
        let mut best: Option<(String, String)> = None;

        for start in &self.starts {
            let Some(rest) = text.strip_prefix(start.as_str()) else {
                continue;
            };
            for command in commands.iter().filter(|c| rest.starts_with(c.as_str())) {
                let raw_len = start.len() + command.len();
                if best.as_ref().is_none_or(|(raw, _)| raw.len() < raw_len) {
                    best = Some((format!("{start}{command}"), command.clone()));
                }
            }
        }
        best
    }
}

impl PrefixMatcher for CommandTable {
    fn seed(
        &self,
        _bot: &BoxedBot,
        event: &Event,
        state: &mut State,
    ) -> (Option<String>, Option<String>) {
        let found = event
            .message()
            .and_then(|message| message.first())
            .and_then(|segment| segment.as_text())
            .and_then(|text| self.longest_match(text.trim_start()));

        let (raw_command, command) = match found {
            Some((raw, command)) => (Some(raw), Some(command)),
            None => (None, None),
        };
        state.insert(
            PREFIX_KEY.to_string(),
            json!({
                "raw_command": raw_command.clone().map_or(Value::Null, Value::String),
                "command": command.clone().map_or(Value::Null, Value::String),
            }),
        );
        (raw_command, command)
    }
}

impl fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTable")
            .field("starts", &self.starts)
            .field("commands", &*self.commands.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockBot, message_event, notice_event};

    fn table() -> CommandTable {
        let table = CommandTable::new(["/", "!"]);
        table.register("echo");
        table.register("echoall");
        table.register("help");
        table
    }

    #[test]
    fn test_seeds_longest_command() {
        let bot = MockBot::boxed();
        let mut state = State::new();
        let event = message_event("private", "  /echoall hi");

        let seeded = table().seed(&bot, &event, &mut state);
        assert_eq!(
            seeded,
            (Some("/echoall".to_string()), Some("echoall".to_string()))
        );
        assert_eq!(
            state[PREFIX_KEY],
            json!({"raw_command": "/echoall", "command": "echoall"})
        );
    }

    #[test]
    fn test_alternate_start() {
        let bot = MockBot::boxed();
        let mut state = State::new();
        let event = message_event("group", "!help");

        let (raw, command) = table().seed(&bot, &event, &mut state);
        assert_eq!(raw.as_deref(), Some("!help"));
        assert_eq!(command.as_deref(), Some("help"));
    }

    #[test]
    fn test_no_match_writes_nulls() {
        let bot = MockBot::boxed();
        let table = table();

        let mut state = State::new();
        let event = message_event("private", "echo without start");
        assert_eq!(table.seed(&bot, &event, &mut state), (None, None));
        assert_eq!(
            state[PREFIX_KEY],
            json!({"raw_command": null, "command": null})
        );

        let mut state = State::new();
        assert_eq!(table.seed(&bot, &notice_event("group_increase"), &mut state), (None, None));
    }

    #[test]
    fn test_empty_starts_match_bare_commands() {
        let bot = MockBot::boxed();
        let table = CommandTable::new(Vec::<String>::new());
        assert!(table.register("ping"));
        assert!(!table.register("ping"));

        let mut state = State::new();
        let (_, command) = table.seed(&bot, &message_event("private", "ping"), &mut state);
        assert_eq!(command.as_deref(), Some("ping"));
    }
}
