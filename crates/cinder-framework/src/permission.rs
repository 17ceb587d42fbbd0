//! Permissions: who may trigger a matcher.
//!
//! Permissions use the same [`Predicate`] contract as rules but are checked
//! first, and a matcher passes when any one of its permissions does.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::rule::{Predicate, from_fn};
use crate::state::State;
use cinder_core::{BoxedBot, Event, EventType};

/// A shared permission.
pub type Permission = Arc<dyn Predicate>;

/// Allows every event.
pub fn everyone() -> impl Predicate {
    from_fn(|_event, _state| Ok(true))
}

/// Allows private messages only.
pub fn private() -> impl Predicate {
    from_fn(|event, _state| {
        Ok(event.event_type() == EventType::Message && event.detail_type() == Some("private"))
    })
}

/// Allows group messages only.
pub fn group() -> impl Predicate {
    from_fn(|event, _state| {
        Ok(event.event_type() == EventType::Message && event.detail_type() == Some("group"))
    })
}

/// Allows events from a fixed set of users.
pub struct UserPermission {
    ids: HashSet<i64>,
}

#[async_trait]
impl Predicate for UserPermission {
    async fn check(
        &self,
        _bot: &BoxedBot,
        event: &Event,
        _state: &mut State,
    ) -> anyhow::Result<bool> {
        Ok(event.user_id().is_some_and(|id| self.ids.contains(&id)))
    }
}

/// Allows events from the listed user ids.
pub fn users(ids: impl IntoIterator<Item = i64>) -> UserPermission {
    UserPermission {
        ids: ids.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockBot, message_event};

    fn allows(permission: &dyn Predicate, event: &Event) -> bool {
        let bot = MockBot::boxed();
        tokio_test::block_on(permission.check(&bot, event, &mut State::new())).unwrap()
    }

    #[test]
    fn test_message_scope() {
        let private_event = message_event("private", "hi");
        let group_event = message_event("group", "hi");

        assert!(allows(&private(), &private_event));
        assert!(!allows(&private(), &group_event));
        assert!(allows(&group(), &group_event));
        assert!(allows(&everyone(), &group_event));
    }

    #[test]
    fn test_users() {
        let event = message_event("group", "hi");
        assert!(allows(&users([456]), &event));
        assert!(!allows(&users([1, 2]), &event));
    }
}
