//! The matcher priority dispatcher.
//!
//! [`Dispatcher::handle_event`] drives one event through the registered
//! matchers:
//!
//! 1. Every preprocessor runs concurrently over a fresh shared state. A
//!    single [`Preprocess::Abort`] ends the dispatch.
//! 2. The prefix matcher, if any, seeds the state once.
//! 3. Priority tiers run in ascending order. Within a tier every matcher runs
//!    concurrently on its own copy of the state, and the tier is joined
//!    before the next one starts.
//! 4. After each tier, expired and single-use matchers are removed in one
//!    registry update, and a blocking matcher halts the remaining tiers.
//!
//! Faults in user callbacks never leave a matcher. Each one is logged and
//! mapped to a [`MatcherOutcome`], so a failing matcher cannot stop its
//! siblings.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cinder_framework::{Dispatcher, MatcherRegistry, PreprocessorRegistry, on_message};
//!
//! let matchers = Arc::new(MatcherRegistry::new());
//! matchers.register(on_message().priority(5).block(true).handler(echo));
//!
//! let dispatcher = Dispatcher::new(matchers, Arc::new(PreprocessorRegistry::new()));
//! let outcome = dispatcher.handle_event(bot, Arc::new(event)).await;
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::Mutex;
use tracing::{Instrument, Level, debug, error, info, span};

use crate::error::catch_fault;
use crate::matcher::Matcher;
use crate::prefix::PrefixMatcher;
use crate::preprocessor::{Preprocess, PreprocessorRegistry};
use crate::registry::{MatcherId, MatcherRegistry};
use crate::state::State;
use cinder_core::{BoxedBot, Event, EventType};

// =============================================================================
// Outcomes
// =============================================================================

/// Whether a matcher stays registered after a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    Retained,
    Removed,
}

/// Whether lower-priority tiers run after a matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    ContinueLower,
    HaltLower,
}

/// What happened to one matcher during one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherOutcome {
    /// The expiry time had passed. Nothing was evaluated.
    Expired,
    /// A permission or rule did not pass.
    Rejected,
    /// A permission or rule failed or panicked.
    Faulted,
    /// The handlers ran, whether or not they succeeded.
    Ran {
        retention: Retention,
        propagation: Propagation,
    },
}

impl MatcherOutcome {
    pub fn retention(self) -> Retention {
        match self {
            Self::Expired => Retention::Removed,
            Self::Ran { retention, .. } => retention,
            Self::Rejected | Self::Faulted => Retention::Retained,
        }
    }

    pub fn propagation(self) -> Propagation {
        match self {
            Self::Ran { propagation, .. } => propagation,
            _ => Propagation::ContinueLower,
        }
    }
}

/// How the dispatch of one event ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A preprocessor aborted the event.
    Ignored,
    /// Every tier ran.
    Completed,
    /// A blocking matcher at `priority` stopped the lower tiers.
    Halted { priority: u32 },
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Routes events to the matchers of a [`MatcherRegistry`].
///
/// The dispatcher holds handles to the registries rather than owning them,
/// so matchers can be registered while events are being dispatched.
#[derive(Clone)]
pub struct Dispatcher {
    matchers: Arc<MatcherRegistry>,
    preprocessors: Arc<PreprocessorRegistry>,
    prefix: Option<Arc<dyn PrefixMatcher>>,
}

impl Dispatcher {
    pub fn new(matchers: Arc<MatcherRegistry>, preprocessors: Arc<PreprocessorRegistry>) -> Self {
        Self {
            matchers,
            preprocessors,
            prefix: None,
        }
    }

    /// Sets the collaborator that seeds the state before the tiers run.
    pub fn with_prefix_matcher(mut self, prefix: Arc<dyn PrefixMatcher>) -> Self {
        self.prefix = Some(prefix);
        self
    }

    pub fn matchers(&self) -> &Arc<MatcherRegistry> {
        &self.matchers
    }

    pub fn preprocessors(&self) -> &Arc<PreprocessorRegistry> {
        &self.preprocessors
    }

    /// Dispatches one event to completion.
    pub async fn handle_event(&self, bot: BoxedBot, event: Arc<Event>) -> DispatchOutcome {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            bot = %bot.self_id(),
            event_name = %event.name()
        );
        self.dispatch(bot, event).instrument(span).await
    }

    async fn dispatch(&self, bot: BoxedBot, event: Arc<Event>) -> DispatchOutcome {
        log_event(&event);

        let Some(mut state) = self.preprocess(&bot, &event).await else {
            return DispatchOutcome::Ignored;
        };

        if let Some(prefix) = &self.prefix {
            let (raw_command, command) = prefix.seed(&bot, &event, &mut state);
            if let Some(command) = command {
                debug!(raw_command = ?raw_command, command = %command, "Seeded command prefix");
            }
        }

        for priority in self.matchers.priorities() {
            if self.run_tier(priority, &bot, &event, &state).await == Propagation::HaltLower {
                debug!(priority, "Propagation halted");
                return DispatchOutcome::Halted { priority };
            }
        }
        DispatchOutcome::Completed
    }

    /// Runs every preprocessor. Returns `None` if the event must be ignored.
    async fn preprocess(&self, bot: &BoxedBot, event: &Arc<Event>) -> Option<State> {
        let processors = self.preprocessors.snapshot();
        if processors.is_empty() {
            return Some(State::new());
        }

        let shared = Mutex::new(State::new());
        let verdicts = join_all(
            processors
                .iter()
                .map(|processor| catch_fault(processor.process(bot, event, &shared))),
        )
        .await;

        let mut proceed = true;
        for verdict in verdicts {
            match verdict {
                Ok(Preprocess::Proceed) => {}
                Ok(Preprocess::Abort) => proceed = false,
                Err(e) => {
                    error!(error = %e, "Preprocessor failed, ignoring event");
                    proceed = false;
                }
            }
        }

        if proceed {
            Some(shared.into_inner())
        } else {
            info!(event_name = %event.name(), "Event ignored by preprocessor");
            None
        }
    }

    /// Runs one tier concurrently, then applies its removals.
    async fn run_tier(
        &self,
        priority: u32,
        bot: &BoxedBot,
        event: &Arc<Event>,
        state: &State,
    ) -> Propagation {
        let snapshot = self.matchers.snapshot(priority);
        if snapshot.is_empty() {
            return Propagation::ContinueLower;
        }

        let now = Utc::now();
        let outcomes = join_all(
            snapshot
                .iter()
                .map(|(_, matcher)| run_matcher(matcher, bot, event, state.clone(), now)),
        )
        .await;

        let mut removals: Vec<MatcherId> = Vec::new();
        let mut propagation = Propagation::ContinueLower;
        for ((id, _), outcome) in snapshot.iter().zip(outcomes) {
            if outcome.retention() == Retention::Removed {
                removals.push(*id);
            }
            if outcome.propagation() == Propagation::HaltLower {
                propagation = Propagation::HaltLower;
            }
        }

        let removed = self.matchers.remove_all(priority, &removals);
        if removed > 0 {
            debug!(priority, removed, "Removed matchers");
        }
        propagation
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("matchers", &self.matchers)
            .field("preprocessors", &self.preprocessors)
            .field("has_prefix_matcher", &self.prefix.is_some())
            .finish()
    }
}

/// Takes one matcher through expiry, check and run.
async fn run_matcher(
    matcher: &Matcher,
    bot: &BoxedBot,
    event: &Arc<Event>,
    mut state: State,
    now: DateTime<Utc>,
) -> MatcherOutcome {
    if matcher.is_expired_at(now) {
        debug!(matcher = %matcher, "Matcher expired");
        return MatcherOutcome::Expired;
    }

    match matcher.check(bot, event, &mut state).await {
        Ok(true) => {}
        Ok(false) => return MatcherOutcome::Rejected,
        Err(e) => {
            error!(matcher = %matcher, error = %e, "Matcher check failed");
            return MatcherOutcome::Faulted;
        }
    }

    info!(matcher = %matcher, "Event will be handled");
    match matcher.run(bot, event, state).await {
        Ok(()) => debug!(matcher = %matcher, "Matcher finished"),
        Err(e) => error!(matcher = %matcher, error = %e, "Matcher handler failed"),
    }

    MatcherOutcome::Ran {
        retention: if matcher.is_temp() {
            Retention::Removed
        } else {
            Retention::Retained
        },
        propagation: if matcher.is_blocking() {
            Propagation::HaltLower
        } else {
            Propagation::ContinueLower
        },
    }
}

/// Writes the one-line summary of a received event.
fn log_event(event: &Event) {
    match event.event_type() {
        EventType::Message => {
            let message = event.message().map(ToString::to_string).unwrap_or_default();
            let sender = event.user_id().map(|id| id.to_string()).unwrap_or_default();
            match event.group_id() {
                Some(group) => info!(
                    id = %event.id().map(|id| id.to_string()).unwrap_or_default(),
                    sender = %sender,
                    group,
                    "Message: {message}"
                ),
                None => info!(
                    id = %event.id().map(|id| id.to_string()).unwrap_or_default(),
                    sender = %sender,
                    "Message: {message}"
                ),
            }
        }
        EventType::MetaEvent => debug!(event_name = %event.name(), "Meta event"),
        _ => info!(event_name = %event.name(), "Event"),
    }
}

// =============================================================================
// Tests
// =============================================================================
