//! # Cinder Framework
//!
//! Matchers and the event dispatcher.
//!
//! This layer provides:
//! - [`Matcher`]: permissions, rules and handlers with a priority, plus the
//!   `block`, `temp` and expiry controls
//! - [`MatcherRegistry`] and [`PreprocessorRegistry`], owned registries shared
//!   by handle
//! - [`Dispatcher`]: tiered, concurrent dispatch of one event
//! - [`CommandTable`]: command-prefix seeding for [`rule::command`]
//! - Builder functions (`on_message`, `on_command`, ...)
//!
//! User callbacks report failures with [`anyhow`]; the dispatcher contains
//! them per matcher.

pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod matcher;
pub mod matcher_builders;
pub mod permission;
pub mod prefix;
pub mod preprocessor;
pub mod registry;
pub mod rule;
pub mod state;

#[cfg(test)]
mod testing;

pub use dispatcher::{DispatchOutcome, Dispatcher, MatcherOutcome, Propagation, Retention};
pub use error::Panicked;
pub use handler::{BoxedHandler, into_handler};
pub use matcher::Matcher;
pub use matcher_builders::{on_command, on_message, on_meta_event, on_notice, on_request};
pub use permission::Permission;
pub use prefix::{CommandTable, PrefixMatcher};
pub use preprocessor::{Preprocess, Preprocessor, PreprocessorRegistry};
pub use registry::{MatcherId, MatcherRegistry};
pub use rule::{Predicate, Rule};
pub use state::{PREFIX_KEY, State};
