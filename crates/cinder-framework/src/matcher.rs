//! Matchers: registered handler descriptors.
//!
//! A [`Matcher`] bundles the conditions under which it fires (event type,
//! permissions, rules, expiry) with the handlers it runs and the control
//! flags the dispatcher honours afterwards:
//!
//! - `priority`: tier the matcher is registered in; lower runs first
//! - `block`: once it has run, lower-priority tiers are skipped for the event
//! - `temp`: removed from the registry after its first run
//! - `expire_time`: removed unchecked once this instant has passed
//!
//! # Example
//!
//! ```rust,ignore
//! use cinder_framework::{Matcher, rule};
//! use cinder_core::EventType;
//!
//! let matcher = Matcher::new()
//!     .name("greeter")
//!     .event_type(EventType::Message)
//!     .priority(5)
//!     .block(true)
//!     .rule(rule::to_me())
//!     .handler(|bot, event, _state| async move {
//!         bot.send(&event, "hello".into(), true).await?;
//!         Ok(())
//!     });
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::error::catch_fault;
use crate::handler::{BoxedHandler, into_handler};
use crate::permission::Permission;
use crate::rule::{Predicate, Rule};
use crate::state::State;
use cinder_core::{BoxedBot, Event, EventType};

/// Internal data for a Matcher.
///
/// Wrapped in an `Arc` so that registry snapshots are cheap; builders go
/// through `Arc::make_mut`.
#[derive(Clone)]
struct MatcherInner {
    name: Option<String>,
    priority: u32,
    block: bool,
    temp: bool,
    expire_time: Option<DateTime<Utc>>,
    event_type: Option<EventType>,
    permissions: Vec<Permission>,
    rules: Vec<Rule>,
    handlers: Vec<BoxedHandler>,
}

/// A handler descriptor registered with a
/// [`MatcherRegistry`](crate::MatcherRegistry).
#[derive(Clone)]
pub struct Matcher {
    inner: Arc<MatcherInner>,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Matcher {
    /// Creates a matcher with priority 1 that accepts every event.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MatcherInner {
                name: None,
                priority: 1,
                block: false,
                temp: false,
                expire_time: None,
                event_type: None,
                permissions: Vec::new(),
                rules: Vec::new(),
                handlers: Vec::new(),
            }),
        }
    }

    fn inner_mut(&mut self) -> &mut MatcherInner {
        Arc::make_mut(&mut self.inner)
    }

    // ------------------------------------------------------------------------
    // Builder
    // ------------------------------------------------------------------------

    /// Sets a name used in logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner_mut().name = Some(name.into());
        self
    }

    pub fn priority(mut self, priority: u32) -> Self {
        self.inner_mut().priority = priority;
        self
    }

    /// Stops lower-priority tiers from running after this matcher runs.
    pub fn block(mut self, block: bool) -> Self {
        self.inner_mut().block = block;
        self
    }

    /// Makes the matcher single-use.
    pub fn temp(mut self, temp: bool) -> Self {
        self.inner_mut().temp = temp;
        self
    }

    /// Retires the matcher once `expire_time` has passed.
    pub fn expire_at(mut self, expire_time: DateTime<Utc>) -> Self {
        self.inner_mut().expire_time = Some(expire_time);
        self
    }

    /// Restricts the matcher to one event category.
    pub fn event_type(mut self, event_type: EventType) -> Self {
        self.inner_mut().event_type = Some(event_type);
        self
    }

    /// Adds a rule. All rules must pass.
    pub fn rule(mut self, rule: impl Predicate + 'static) -> Self {
        self.inner_mut().rules.push(Arc::new(rule));
        self
    }

    /// Adds a permission. Any one permission passing is enough; a matcher
    /// without permissions admits everyone.
    pub fn permission(mut self, permission: impl Predicate + 'static) -> Self {
        self.inner_mut().permissions.push(Arc::new(permission));
        self
    }

    /// Adds a handler. Handlers run in the order they were added.
    pub fn handler<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(BoxedBot, Arc<Event>, State) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.inner_mut().handlers.push(into_handler(f));
        self
    }

    /// Adds a pre-built boxed handler.
    pub fn handler_boxed(mut self, handler: BoxedHandler) -> Self {
        self.inner_mut().handlers.push(handler);
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn get_name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub fn get_priority(&self) -> u32 {
        self.inner.priority
    }

    pub fn is_blocking(&self) -> bool {
        self.inner.block
    }

    pub fn is_temp(&self) -> bool {
        self.inner.temp
    }

    pub fn expire_time(&self) -> Option<DateTime<Utc>> {
        self.inner.expire_time
    }

    /// Returns true when the expiry instant lies strictly before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.inner.expire_time.is_some_and(|expire| expire < now)
    }

    pub fn handler_count(&self) -> usize {
        self.inner.handlers.len()
    }

    // ------------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------------

    /// Evaluates event type, then permissions, then rules.
    ///
    /// Predicates may write `state`. A failing or panicking predicate yields
    /// `Err`.
    pub async fn check(
        &self,
        bot: &BoxedBot,
        event: &Event,
        state: &mut State,
    ) -> anyhow::Result<bool> {
        if let Some(event_type) = self.inner.event_type
            && event_type != event.event_type()
        {
            return Ok(false);
        }

        if !self.inner.permissions.is_empty() {
            let mut permitted = false;
            for permission in &self.inner.permissions {
                if catch_fault(permission.check(bot, event, state)).await? {
                    permitted = true;
                    break;
                }
            }
            if !permitted {
                trace!(matcher = %self, "Permission denied");
                return Ok(false);
            }
        }

        for rule in &self.inner.rules {
            if !catch_fault(rule.check(bot, event, state)).await? {
                trace!(matcher = %self, "Rule not satisfied");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Runs the handlers in order, each with its own copy of `state`.
    ///
    /// Stops at the first handler that fails or panics.
    pub async fn run(&self, bot: &BoxedBot, event: &Arc<Event>, state: State) -> anyhow::Result<()> {
        for (index, handler) in self.inner.handlers.iter().enumerate() {
            trace!(matcher = %self, handler_index = index, "Executing handler");
            catch_fault(handler(Arc::clone(bot), Arc::clone(event), state.clone())).await?;
        }
        Ok(())
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Matcher(name={}, priority={}, temp={}, block={})",
            self.get_name().unwrap_or("unnamed"),
            self.inner.priority,
            self.inner.temp,
            self.inner.block
        )
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("name", &self.inner.name)
            .field("priority", &self.inner.priority)
            .field("block", &self.inner.block)
            .field("temp", &self.inner.temp)
            .field("expire_time", &self.inner.expire_time)
            .field("event_type", &self.inner.event_type)
            .field("permissions", &self.inner.permissions.len())
            .field("rules", &self.inner.rules.len())
            .field("handlers", &self.inner.handlers.len())
            .finish()
    }
}
