//! Matcher builder functions for common event types.
//!
//! # Example
//!
//! ```rust,ignore
//! use cinder_framework::{on_command, on_message, on_notice};
//!
//! matchers.register(on_message().handler(log_handler));
//! matchers.register(on_notice().priority(5).handler(notice_handler));
//! matchers.register(on_command(&commands, "echo").handler(echo_handler));
//! ```

use crate::matcher::Matcher;
use crate::prefix::CommandTable;
use crate::rule;
use cinder_core::EventType;

/// Creates a matcher that only handles message events.
pub fn on_message() -> Matcher {
    Matcher::new().event_type(EventType::Message)
}

/// Creates a matcher that only handles notice events.
pub fn on_notice() -> Matcher {
    Matcher::new().event_type(EventType::Notice)
}

/// Creates a matcher that only handles request events.
pub fn on_request() -> Matcher {
    Matcher::new().event_type(EventType::Request)
}

/// Creates a matcher that only handles meta events such as heartbeats.
pub fn on_meta_event() -> Matcher {
    Matcher::new().event_type(EventType::MetaEvent)
}

/// Creates a message matcher for a command.
///
/// The command is registered with `table` so the dispatcher's prefix seeding
/// can recognise it.
pub fn on_command(table: &CommandTable, command: impl Into<String>) -> Matcher {
    let command = command.into();
    table.register(command.clone());
    on_message()
        .name(command.clone())
        .rule(rule::command(command))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::State;
    use crate::testing::{MockBot, message_event, notice_event};

    #[tokio::test]
    async fn test_event_type_builders() {
        let bot = MockBot::boxed();
        let message = message_event("private", "hi");
        let notice = notice_event("group_increase");

        let mut state = State::new();
        assert!(on_message().check(&bot, &message, &mut state).await.unwrap());
        assert!(!on_message().check(&bot, &notice, &mut state).await.unwrap());
        assert!(on_notice().check(&bot, &notice, &mut state).await.unwrap());
        assert!(!on_request().check(&bot, &notice, &mut state).await.unwrap());
        assert!(!on_meta_event().check(&bot, &message, &mut state).await.unwrap());
    }

    #[test]
    fn test_on_command_registers() {
        let table = CommandTable::new(["/"]);
        let matcher = on_command(&table, "weather");
        assert!(table.contains("weather"));
        assert_eq!(matcher.get_name(), Some("weather"));
    }
}
