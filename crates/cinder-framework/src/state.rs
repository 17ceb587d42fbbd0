//! Per-event dispatch state.

use std::collections::HashMap;

use serde_json::Value;

/// Scratch space shared by the stages handling one event.
///
/// A fresh state is created for every event. Each matcher receives its own
/// copy, so writes made by one matcher's rule are never seen by its siblings.
pub type State = HashMap<String, Value>;

/// State key written by the command-prefix matcher.
pub const PREFIX_KEY: &str = "_prefix";
