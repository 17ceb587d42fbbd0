//! Rules: async predicates deciding whether a matcher handles an event.
//!
//! Rules and permissions share the [`Predicate`] contract. A predicate sees
//! the bot, the event and the matcher's own copy of the dispatch state,
//! which it may read and write. Returning an error counts as "no match".
//!
//! ```rust,ignore
//! use cinder_framework::{on_message, rule};
//!
//! let matcher = on_message()
//!     .rule(rule::to_me())
//!     .rule(rule::from_fn(|event, _state| {
//!         Ok(event.plain_text().is_some_and(|text| text.contains("ping")))
//!     }));
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::state::{PREFIX_KEY, State};
use cinder_core::{BoxedBot, Event};

/// An async check over an event.
#[async_trait]
pub trait Predicate: Send + Sync {
    async fn check(&self, bot: &BoxedBot, event: &Event, state: &mut State)
    -> anyhow::Result<bool>;
}

/// A shared rule.
pub type Rule = Arc<dyn Predicate>;

/// A predicate backed by a synchronous closure.
pub struct FnPredicate<F>(F);

#[async_trait]
impl<F> Predicate for FnPredicate<F>
where
    F: Fn(&Event, &mut State) -> anyhow::Result<bool> + Send + Sync,
{
    async fn check(
        &self,
        _bot: &BoxedBot,
        event: &Event,
        state: &mut State,
    ) -> anyhow::Result<bool> {
        (self.0)(event, state)
    }
}

/// Wraps a closure as a predicate.
pub fn from_fn<F>(f: F) -> FnPredicate<F>
where
    F: Fn(&Event, &mut State) -> anyhow::Result<bool> + Send + Sync,
{
    FnPredicate(f)
}

/// Matches events addressed to the bot.
pub fn to_me() -> impl Predicate {
    from_fn(|event, _state| Ok(event.to_me()))
}

/// Matches when the command prefix seeded into the state equals a command.
///
/// See [`CommandTable`](crate::CommandTable) for how the prefix is seeded.
pub struct CommandRule {
    command: String,
}

#[async_trait]
impl Predicate for CommandRule {
    async fn check(
        &self,
        _bot: &BoxedBot,
        _event: &Event,
        state: &mut State,
    ) -> anyhow::Result<bool> {
        let seeded = state
            .get(PREFIX_KEY)
            .and_then(|prefix| prefix.get("command"))
            .and_then(Value::as_str);
        Ok(seeded == Some(self.command.as_str()))
    }
}

/// Matches events whose seeded command is `command`.
pub fn command(command: impl Into<String>) -> CommandRule {
    CommandRule {
        command: command.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockBot, message_event};
    use serde_json::json;

    #[test]
    fn test_to_me() {
        let bot = MockBot::boxed();
        let mut event = message_event("group", "hello");
        let rule = to_me();

        let mut state = State::new();
        assert!(!tokio_test::block_on(rule.check(&bot, &event, &mut state)).unwrap());

        event.set_to_me(true);
        assert!(tokio_test::block_on(rule.check(&bot, &event, &mut state)).unwrap());
    }

    #[test]
    fn test_command() {
        let bot = MockBot::boxed();
        let event = message_event("private", "/echo hi");
        let rule = command("echo");

        let mut state = State::new();
        assert!(!tokio_test::block_on(rule.check(&bot, &event, &mut state)).unwrap());

        state.insert(
            PREFIX_KEY.into(),
            json!({"raw_command": "/echo", "command": "echo"}),
        );
        assert!(tokio_test::block_on(rule.check(&bot, &event, &mut state)).unwrap());
    }

    #[test]
    fn test_closure_may_write_state() {
        let bot = MockBot::boxed();
        let event = message_event("private", "x");
        let rule = from_fn(|_event, state| {
            state.insert("seen".into(), Value::Bool(true));
            Ok(true)
        });

        let mut state = State::new();
        assert!(tokio_test::block_on(rule.check(&bot, &event, &mut state)).unwrap());
        assert_eq!(state.get("seen"), Some(&Value::Bool(true)));
    }
}
